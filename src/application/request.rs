use super::core::Core;
use crate::domain::payment::ApiResponse;
use crate::domain::ports::{LogLevel, Method, TransportRequest};
use crate::domain::problem::ProblemDocument;
use crate::error::{PaymentError, Result, TransportError};
use reqwest::Url;
use serde_json::{Value, json};
use std::time::Instant;

/// Reduces an absolute URL to its path and query; relative targets pass through.
pub fn endpoint_of(url: &str) -> Result<String> {
    let endpoint = match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => match parsed.query() {
            Some(query) if !query.is_empty() => format!("{}?{}", parsed.path(), query),
            _ => parsed.path().to_string(),
        },
        _ => url.trim().to_string(),
    };

    if endpoint.is_empty() {
        return Err(PaymentError::InvalidRequest("Invalid url".to_string()));
    }

    Ok(endpoint)
}

/// Turns a transport failure into a `RemoteError`, keeping any problem details.
pub(crate) fn remote_error_from(error: TransportError) -> PaymentError {
    if let Some(doc) = error.body.as_deref().and_then(ProblemDocument::parse) {
        return PaymentError::RemoteError {
            message: doc.summary(),
            status: error.status,
            problems: doc.problems,
            body: error.body,
        };
    }

    PaymentError::RemoteError {
        message: "API Exception. Please check logs".to_string(),
        status: error.status,
        problems: Vec::new(),
        body: error.body,
    }
}

impl Core {
    /// Executes a request against the remote processor.
    ///
    /// `url` may be absolute; only its path and query are dispatched.
    pub async fn request(&self, method: Method, url: &str, params: Option<Value>) -> Result<ApiResponse> {
        let path = endpoint_of(url)?;

        let start = Instant::now();
        self.log(
            LogLevel::Debug,
            &format!(
                "Request: {} {} {}",
                method,
                path,
                params
                    .as_ref()
                    .and_then(|p| serde_json::to_string_pretty(p).ok())
                    .unwrap_or_else(|| "[]".to_string())
            ),
            Value::Null,
        );

        let request = TransportRequest {
            method,
            path: path.clone(),
            body: params,
            user_agent: self.user_agent.clone(),
        };

        match self.transport.request(request).await {
            Ok(response) => {
                self.log(
                    LogLevel::Debug,
                    &format!(
                        "[{:.4}] Response: {}",
                        start.elapsed().as_secs_f64(),
                        response.body
                    ),
                    json!({ "status": response.status }),
                );

                if response.body.trim().is_empty() {
                    return Ok(ApiResponse::new(Value::Null));
                }
                let value = serde_json::from_str(&response.body).map_err(|e| {
                    PaymentError::remote(format!("Invalid response from {path}: {e}"))
                })?;
                Ok(ApiResponse::new(value))
            }
            Err(error) => {
                self.log(
                    LogLevel::Debug,
                    &format!(
                        "[{:.4}] Client Exception. Check debug info: {} {}",
                        start.elapsed().as_secs_f64(),
                        error,
                        error.body.as_deref().unwrap_or_default()
                    ),
                    json!({ "method": method.to_string(), "path": path, "status": error.status }),
                );

                Err(remote_error_from(error))
            }
        }
    }
}
