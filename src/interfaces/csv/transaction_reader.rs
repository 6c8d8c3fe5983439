use crate::domain::money::MinorUnits;
use crate::domain::transaction::{FinancialTransaction, TransactionState, TransactionType};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;

/// One transaction notification row.
///
/// Amounts are minor units. `state` defaults to `Completed`, `created` to now.
#[derive(Debug, Deserialize)]
struct NotificationRecord {
    #[serde(rename = "type")]
    r#type: String,
    number: String,
    amount: i64,
    #[serde(default)]
    vat_amount: Option<i64>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    payee_reference: Option<String>,
}

impl NotificationRecord {
    fn into_transaction(self) -> Result<FinancialTransaction> {
        if self.number.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Transaction number is required".to_string(),
            ));
        }

        let state = self
            .state
            .filter(|s| !s.is_empty())
            .map(TransactionState::from)
            .unwrap_or(TransactionState::Completed);

        Ok(FinancialTransaction {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("notification/{}", self.number)),
            created: self.created.unwrap_or_else(Utc::now),
            updated: None,
            r#type: TransactionType::from(self.r#type),
            state,
            number: self.number,
            amount: MinorUnits::new(self.amount),
            vat_amount: MinorUnits::new(self.vat_amount.unwrap_or_default()),
            description: self.description.unwrap_or_default(),
            payee_reference: self.payee_reference.filter(|r| !r.is_empty()),
            receipt_reference: None,
            failed_reason: None,
        })
    }
}

/// Reads transaction notifications from a CSV source.
///
/// Wraps `csv::Reader` and yields `Result<FinancialTransaction>` per row, so a
/// malformed row does not stop the stream.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a new `TransactionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and converts the rows.
    pub fn transactions(self) -> impl Iterator<Item = Result<FinancialTransaction>> {
        self.reader
            .into_deserialize::<NotificationRecord>()
            .map(|result| result.map_err(PaymentError::from)?.into_transaction())
    }
}
