use super::money::MinorUnits;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Kind of a remote ledger entry.
///
/// Unrecognised names are kept verbatim in `Other` so they can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Verification,
    Authorization,
    Capture,
    Sale,
    Cancellation,
    Reversal,
    Other(String),
}

impl TransactionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Verification => "Verification",
            Self::Authorization => "Authorization",
            Self::Capture => "Capture",
            Self::Sale => "Sale",
            Self::Cancellation => "Cancellation",
            Self::Reversal => "Reversal",
            Self::Other(name) => name,
        }
    }

    /// Transactions that move funds to the merchant.
    pub fn is_capture(&self) -> bool {
        matches!(self, Self::Capture | Self::Sale)
    }

    /// Transactions that settle a checkout attempt.
    pub fn settles_payment(&self) -> bool {
        matches!(self, Self::Authorization | Self::Sale)
    }
}

impl From<String> for TransactionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Verification" => Self::Verification,
            "Authorization" => Self::Authorization,
            "Capture" => Self::Capture,
            "Sale" => Self::Sale,
            "Cancellation" => Self::Cancellation,
            "Reversal" => Self::Reversal,
            _ => Self::Other(value),
        }
    }
}

impl From<TransactionType> for String {
    fn from(value: TransactionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionState {
    Initialized,
    AwaitingActivity,
    Completed,
    Failed,
    Other(String),
}

impl TransactionState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialized => "Initialized",
            Self::AwaitingActivity => "AwaitingActivity",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Other(name) => name,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Initialized | Self::AwaitingActivity)
    }
}

impl From<String> for TransactionState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Initialized" => Self::Initialized,
            "AwaitingActivity" => Self::AwaitingActivity,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<TransactionState> for String {
    fn from(value: TransactionState) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote transaction numbers arrive as JSON integers or strings.
fn number_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

/// An atomic remote ledger entry, as represented locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTransaction {
    pub id: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub r#type: TransactionType,
    /// Missing on the wire reads as an unrecognised state, never `Completed`
    #[serde(default = "unknown_state")]
    pub state: TransactionState,
    /// Remote sequence number; the dedupe key per order
    #[serde(deserialize_with = "number_as_string")]
    pub number: String,
    pub amount: MinorUnits,
    #[serde(default)]
    pub vat_amount: MinorUnits,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payee_reference: Option<String>,
    #[serde(default)]
    pub receipt_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
}

fn unknown_state() -> TransactionState {
    TransactionState::Other(String::new())
}

impl FinancialTransaction {
    pub fn is_failed(&self) -> bool {
        self.state == TransactionState::Failed
    }

    /// `failedReason`, or `fallback` when the remote gave none.
    pub fn failure_message(&self, fallback: &str) -> String {
        self.failed_reason
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Lookup keys accepted by the transaction ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionField {
    Id,
    Number,
    PayeeReference,
}

impl TransactionField {
    pub fn value_of<'a>(&self, tx: &'a FinancialTransaction) -> Option<&'a str> {
        match self {
            Self::Id => Some(&tx.id),
            Self::Number => Some(&tx.number),
            Self::PayeeReference => tx.payee_reference.as_deref(),
        }
    }
}

/// A card token found on an authorization or verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentToken {
    pub payment_token: Option<String>,
    pub recurrence_token: Option<String>,
    pub card_brand: Option<String>,
    pub masked_pan: Option<String>,
    pub expiry_date: Option<String>,
}

impl PaymentToken {
    pub fn has_token(&self) -> bool {
        self.payment_token.as_deref().is_some_and(|t| !t.is_empty())
            || self.recurrence_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// A remote authorization record (legacy payments API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub id: String,
    #[serde(flatten)]
    pub token: PaymentToken,
    #[serde(default)]
    pub transaction: Option<FinancialTransaction>,
}

/// A remote verification record (legacy payments API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub id: String,
    #[serde(flatten)]
    pub token: PaymentToken,
    #[serde(default)]
    pub transaction: Option<FinancialTransaction>,
}

/// A local refund record created for a Reversal transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditMemo {
    pub order_id: String,
    pub transaction_id: String,
    pub amount: Decimal,
    pub description: String,
}
