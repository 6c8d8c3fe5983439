use super::money::MinorUnits;
use super::order::{Order, OrderStatus, PayeeInfo, PlatformUrls};
use super::transaction::{CreditMemo, FinancialTransaction, PaymentToken, TransactionField};
use crate::error::{Result, TransportError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    /// Path and query only; the host is fixed by the transport
    pub path: String,
    pub body: Option<Value>,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Wire-level access to the remote processor.
///
/// Retries and timeouts, if any, live behind this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// The hosting platform, as seen by the payment core.
///
/// Implementations must make `can_update_order_status` + `update_order_status`
/// (or `record_transaction_note`) and `is_credit_memo_exist` +
/// `create_credit_memo` atomic per order: the core does no locking of its own.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Log sink. Must not fail.
    fn log(&self, level: LogLevel, message: &str, context: &Value);

    /// Appended to the user agent of outgoing requests.
    fn initiating_system_user_agent(&self) -> Option<String> {
        None
    }

    async fn get_order_data(&self, order_id: &str) -> Result<Order>;
    async fn get_platform_urls(&self, order_id: &str) -> Result<PlatformUrls>;
    async fn get_payee_info(&self, order_id: &str) -> Result<PayeeInfo>;

    /// Idempotency guard consulted before every status update.
    async fn can_update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        transaction_number: Option<&str>,
    ) -> Result<bool>;
    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus>;
    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        message: Option<&str>,
        transaction_number: Option<&str>,
    ) -> Result<()>;

    /// Records `transaction_number` as applied without a status change and
    /// adds `message` as a note. Returns `false`, adding nothing, when the
    /// number was already applied; `can_update_order_status` must reject it
    /// from then on.
    async fn record_transaction_note(
        &self,
        order_id: &str,
        message: &str,
        transaction_number: &str,
    ) -> Result<bool>;

    async fn set_payment_id(&self, order_id: &str, payment_id: &str) -> Result<()>;
    async fn set_payment_order_id(&self, order_id: &str, payment_order_id: &str) -> Result<()>;
    async fn add_order_note(&self, order_id: &str, message: &str) -> Result<()>;

    async fn save_financial_transaction(
        &self,
        order_id: &str,
        transaction: &FinancialTransaction,
    ) -> Result<()>;
    async fn find_financial_transaction(
        &self,
        field: TransactionField,
        value: &str,
    ) -> Result<Option<FinancialTransaction>>;

    /// Extension hook for outgoing payment payloads.
    fn process_payment_object(&self, payment: Value, _order_id: &str) -> Value {
        payment
    }

    /// Extension hook for outgoing transaction payloads.
    fn process_transaction_object(&self, transaction: Value, _order_id: &str) -> Value {
        transaction
    }

    async fn generate_payee_reference(&self, order_id: &str) -> Result<String>;

    async fn create_credit_memo(
        &self,
        order_id: &str,
        amount: Decimal,
        transaction_id: &str,
        description: &str,
    ) -> Result<()>;
    /// Must query persistent state: deliveries arrive in separate invocations.
    async fn is_credit_memo_exist(&self, transaction_id: &str) -> Result<bool>;

    async fn save_payment_token(
        &self,
        customer_id: Option<&str>,
        token: &PaymentToken,
        order_id: &str,
    ) -> Result<()>;
}

/// Persistence for financial transactions and credit memos.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Upserts by `(order_id, number)`.
    async fn save(&self, order_id: &str, transaction: &FinancialTransaction) -> Result<()>;
    async fn find(
        &self,
        field: TransactionField,
        value: &str,
    ) -> Result<Option<(String, FinancialTransaction)>>;
    async fn credit_memo_exists(&self, transaction_id: &str) -> Result<bool>;
    /// Stores `memo` unless one exists for its transaction id; returns whether it was stored.
    async fn record_credit_memo(&self, memo: CreditMemo) -> Result<bool>;
    /// Sum of the credit memos of an order, in minor units.
    async fn credited_total(&self, order_id: &str) -> Result<MinorUnits>;
}

/// Pause between reconciliation attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub type TransportBox = Box<dyn Transport>;
pub type PlatformAdapterBox = Box<dyn PlatformAdapter>;
pub type TransactionLedgerBox = Box<dyn TransactionLedger>;
pub type SleeperBox = Box<dyn Sleeper>;
