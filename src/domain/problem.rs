//! RFC 7807 problem documents returned by the remote processor.

use serde::{Deserialize, Serialize};

const PHONE_FORMAT_HINT: &str = "Your phone number format is wrong. Please input with country code, for example like this +46707777777";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProblemDocument {
    pub title: Option<String>,
    pub detail: Option<String>,
    #[serde(default)]
    pub problems: Vec<Problem>,
}

impl ProblemDocument {
    /// Parses a response body; `None` unless it carries both `title` and `detail`.
    pub fn parse(body: &str) -> Option<Self> {
        let doc: Self = serde_json::from_str(body).ok()?;
        if doc.title.is_some() && doc.detail.is_some() {
            Some(doc)
        } else {
            None
        }
    }

    /// `"{title}. {detail}"`, followed by one `name: description` line per problem.
    pub fn summary(&self) -> String {
        let mut message = format!(
            "{}. {}",
            self.title.as_deref().unwrap_or_default(),
            self.detail.as_deref().unwrap_or_default()
        );

        let detailed: String = self
            .problems
            .iter()
            .map(|p| format!("{}: {}\r\n", p.name, p.description))
            .collect();
        if !detailed.is_empty() {
            message.push_str("\r\n");
            message.push_str(&detailed);
        }

        message
    }
}

fn is_phone_field(name: &str) -> bool {
    name.contains("Msisdn") || name.contains("HomePhoneNumber") || name.contains("WorkPhoneNumber")
}

/// Formats an error response body for display to a merchant or payer.
///
/// Bodies that are not JSON objects are returned verbatim.
pub fn format_error_message(body: &str) -> String {
    let Ok(serde_json::Value::Object(data)) = serde_json::from_str::<serde_json::Value>(body)
    else {
        return body.to_string();
    };

    let mut message = data
        .get("detail")
        .and_then(|d| d.as_str())
        .unwrap_or("Error")
        .to_string();

    let problems: Vec<Problem> = data
        .get("problems")
        .cloned()
        .and_then(|p| serde_json::from_value(p).ok())
        .unwrap_or_default();

    for problem in &problems {
        if is_phone_field(&problem.name) {
            return PHONE_FORMAT_HINT.to_string();
        }
        message.push('\n');
        message.push_str(&format!("{}: {}", problem.name, problem.description));
    }

    message
}
