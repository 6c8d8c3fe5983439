use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded JSON response from the remote processor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiResponse(pub Value);

impl ApiResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Follows a `/`-separated path of object keys.
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .try_fold(&self.0, |value, key| value.get(key))
    }

    /// Deserializes the value at `path`, failing with a remote error if absent.
    pub fn extract<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self
            .pointer(path)
            .cloned()
            .ok_or_else(|| PaymentError::remote(format!("Missing `{path}` in response")))?;
        Ok(serde_json::from_value(value)?)
    }

    /// `href` of the operation with the given `rel`.
    pub fn operation_by_rel(&self, rel: &str) -> Option<String> {
        let operations: Vec<Operation> = self
            .get("operations")
            .cloned()
            .and_then(|ops| serde_json::from_value(ops).ok())
            .unwrap_or_default();
        operations
            .into_iter()
            .find(|op| op.rel == rel)
            .map(|op| op.href)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub rel: String,
    pub href: String,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

/// The fields the core reads from a payment or payment order resource.
///
/// A `remaining*Amount` of `None` means the remote omitted the field, which
/// it does once the corresponding action has fully consumed the amount.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub remaining_capture_amount: Option<Decimal>,
    #[serde(default)]
    pub remaining_cancellation_amount: Option<Decimal>,
    #[serde(default)]
    pub remaining_reversal_amount: Option<Decimal>,
    #[serde(default)]
    pub current_payment: Option<ResourceRef>,
}

impl PaymentResource {
    pub fn is_invoice(&self) -> bool {
        self.instrument.as_deref() == Some("Invoice")
    }

    pub fn remaining(&self, kind: RemainingKind) -> Option<Decimal> {
        match kind {
            RemainingKind::Capture => self.remaining_capture_amount,
            RemainingKind::Cancellation => self.remaining_cancellation_amount,
            RemainingKind::Reversal => self.remaining_reversal_amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingKind {
    Capture,
    Cancellation,
    Reversal,
}
