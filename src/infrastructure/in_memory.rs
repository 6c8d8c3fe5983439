use crate::domain::money::MinorUnits;
use crate::domain::order::{Order, OrderStatus, PayeeInfo, PlatformUrls};
use crate::domain::ports::{LogLevel, PlatformAdapter, TransactionLedger, TransactionLedgerBox};
use crate::domain::transaction::{CreditMemo, FinancialTransaction, PaymentToken, TransactionField};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory ledger of financial transactions and credit memos.
///
/// Transactions are keyed by `(order_id, number)`; memos by transaction id.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    transactions: Arc<RwLock<BTreeMap<(String, String), FinancialTransaction>>>,
    credit_memos: Arc<RwLock<BTreeMap<String, CreditMemo>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionLedger for InMemoryLedger {
    async fn save(&self, order_id: &str, transaction: &FinancialTransaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        transactions.insert(
            (order_id.to_string(), transaction.number.clone()),
            transaction.clone(),
        );
        Ok(())
    }

    async fn find(
        &self,
        field: TransactionField,
        value: &str,
    ) -> Result<Option<(String, FinancialTransaction)>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .find(|(_, tx)| field.value_of(tx) == Some(value))
            .map(|((order_id, _), tx)| (order_id.clone(), tx.clone())))
    }

    async fn credit_memo_exists(&self, transaction_id: &str) -> Result<bool> {
        Ok(self.credit_memos.read().await.contains_key(transaction_id))
    }

    async fn record_credit_memo(&self, memo: CreditMemo) -> Result<bool> {
        let mut memos = self.credit_memos.write().await;
        if memos.contains_key(&memo.transaction_id) {
            return Ok(false);
        }
        memos.insert(memo.transaction_id.clone(), memo);
        Ok(true)
    }

    async fn credited_total(&self, order_id: &str) -> Result<MinorUnits> {
        let memos = self.credit_memos.read().await;
        Ok(memos
            .values()
            .filter(|memo| memo.order_id == order_id)
            .map(|memo| MinorUnits::from_major(memo.amount))
            .sum())
    }
}

/// One accepted status transition, kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub message: Option<String>,
    pub transaction_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedToken {
    pub customer_id: Option<String>,
    pub order_id: String,
    pub token: PaymentToken,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Default)]
struct PlatformState {
    orders: HashMap<String, Order>,
    notes: HashMap<String, Vec<String>>,
    status_changes: HashMap<String, Vec<StatusChange>>,
    platform_urls: HashMap<String, PlatformUrls>,
    /// Transaction numbers applied per order
    applied: HashMap<String, HashSet<String>>,
    tokens: Vec<SavedToken>,
    credit_memos_disabled: bool,
}

impl PlatformState {
    fn is_replay(&self, order_id: &str, transaction_number: Option<&str>) -> Result<bool> {
        let order = self
            .orders
            .get(order_id)
            .ok_or_else(|| InMemoryPlatform::order_not_found(order_id))?;
        let Some(number) = transaction_number else {
            return Ok(false);
        };
        Ok(order.transaction_id.as_deref() == Some(number)
            || self
                .applied
                .get(order_id)
                .is_some_and(|applied| applied.contains(number)))
    }

    fn mark_applied(&mut self, order_id: &str, transaction_number: &str) {
        self.applied
            .entry(order_id.to_string())
            .or_default()
            .insert(transaction_number.to_string());
    }

    fn push_note(&mut self, order_id: &str, message: &str) {
        self.notes
            .entry(order_id.to_string())
            .or_default()
            .push(message.to_string());
    }
}

/// A reference platform adapter holding orders in memory.
///
/// `Clone` shares the state, so a handle kept by the caller observes every
/// change made through the `Core` that owns the other handle.
#[derive(Clone)]
pub struct InMemoryPlatform {
    state: Arc<RwLock<PlatformState>>,
    ledger: Arc<dyn TransactionLedger>,
    logs: Arc<std::sync::Mutex<Vec<LogRecord>>>,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::with_ledger(Box::new(InMemoryLedger::new()))
    }

    /// Uses `ledger` for transactions and credit memos.
    pub fn with_ledger(ledger: TransactionLedgerBox) -> Self {
        Self {
            state: Arc::new(RwLock::new(PlatformState::default())),
            ledger: Arc::from(ledger),
            logs: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub async fn insert_order(&self, order: Order) {
        let mut state = self.state.write().await;
        state.orders.insert(order.order_id.clone(), order);
    }

    pub async fn set_platform_urls(&self, order_id: &str, urls: PlatformUrls) {
        let mut state = self.state.write().await;
        state.platform_urls.insert(order_id.to_string(), urls);
    }

    /// Makes `create_credit_memo` fail, as a platform with refunds switched off would.
    pub async fn disable_credit_memos(&self) {
        self.state.write().await.credit_memos_disabled = true;
    }

    pub async fn order(&self, order_id: &str) -> Option<Order> {
        self.state.read().await.orders.get(order_id).cloned()
    }

    pub async fn notes(&self, order_id: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .notes
            .get(order_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn status_changes(&self, order_id: &str) -> Vec<StatusChange> {
        self.state
            .read()
            .await
            .status_changes
            .get(order_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn saved_tokens(&self) -> Vec<SavedToken> {
        self.state.read().await.tokens.clone()
    }

    pub async fn credited_total(&self, order_id: &str) -> Result<MinorUnits> {
        self.ledger.credited_total(order_id).await
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        self.logs
            .lock()
            .map(|logs| logs.clone())
            .unwrap_or_default()
    }

    fn order_not_found(order_id: &str) -> PaymentError {
        PaymentError::Adapter(format!("Order #{order_id} not found"))
    }
}

#[async_trait]
impl PlatformAdapter for InMemoryPlatform {
    fn log(&self, level: LogLevel, message: &str, _context: &Value) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(LogRecord {
                level,
                message: message.to_string(),
            });
        }
    }

    async fn get_order_data(&self, order_id: &str) -> Result<Order> {
        self.order(order_id)
            .await
            .ok_or_else(|| Self::order_not_found(order_id))
    }

    async fn get_platform_urls(&self, order_id: &str) -> Result<PlatformUrls> {
        Ok(self
            .state
            .read()
            .await
            .platform_urls
            .get(order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_payee_info(&self, _order_id: &str) -> Result<PayeeInfo> {
        Ok(PayeeInfo::default())
    }

    async fn can_update_order_status(
        &self,
        order_id: &str,
        _status: OrderStatus,
        transaction_number: Option<&str>,
    ) -> Result<bool> {
        let state = self.state.read().await;
        Ok(!state.is_replay(order_id, transaction_number)?)
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus> {
        Ok(self.get_order_data(order_id).await?.status)
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        message: Option<&str>,
        transaction_number: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.write().await;

        // Re-checked under the write lock: two deliveries may both have passed
        // `can_update_order_status`.
        if state.is_replay(order_id, transaction_number)? {
            tracing::warn!(
                order_id,
                transaction_number,
                "Transaction has already been applied; skipping status update"
            );
            return Ok(());
        }

        if let Some(order) = state.orders.get_mut(order_id) {
            order.status = status;
            if let Some(number) = transaction_number {
                order.transaction_id = Some(number.to_string());
            }
        }
        if let Some(number) = transaction_number {
            state.mark_applied(order_id, number);
        }
        if let Some(message) = message {
            state.push_note(order_id, message);
        }
        state
            .status_changes
            .entry(order_id.to_string())
            .or_default()
            .push(StatusChange {
                status,
                message: message.map(str::to_string),
                transaction_number: transaction_number.map(str::to_string),
            });
        Ok(())
    }

    async fn record_transaction_note(
        &self,
        order_id: &str,
        message: &str,
        transaction_number: &str,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.is_replay(order_id, Some(transaction_number))? {
            tracing::warn!(
                order_id,
                transaction_number,
                "Transaction has already been applied; skipping note"
            );
            return Ok(false);
        }

        state.mark_applied(order_id, transaction_number);
        state.push_note(order_id, message);
        Ok(true)
    }

    async fn set_payment_id(&self, order_id: &str, payment_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| Self::order_not_found(order_id))?;
        order.payment_id = Some(payment_id.to_string());
        Ok(())
    }

    async fn set_payment_order_id(&self, order_id: &str, payment_order_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| Self::order_not_found(order_id))?;
        order.payment_order_id = Some(payment_order_id.to_string());
        Ok(())
    }

    async fn add_order_note(&self, order_id: &str, message: &str) -> Result<()> {
        self.state.write().await.push_note(order_id, message);
        Ok(())
    }

    async fn save_financial_transaction(
        &self,
        order_id: &str,
        transaction: &FinancialTransaction,
    ) -> Result<()> {
        self.ledger.save(order_id, transaction).await
    }

    async fn find_financial_transaction(
        &self,
        field: TransactionField,
        value: &str,
    ) -> Result<Option<FinancialTransaction>> {
        Ok(self.ledger.find(field, value).await?.map(|(_, tx)| tx))
    }

    async fn generate_payee_reference(&self, order_id: &str) -> Result<String> {
        let suffix = Uuid::new_v4().simple().to_string();
        Ok(format!("{order_id}x{}", &suffix[..5]))
    }

    async fn create_credit_memo(
        &self,
        order_id: &str,
        amount: Decimal,
        transaction_id: &str,
        description: &str,
    ) -> Result<()> {
        if self.state.read().await.credit_memos_disabled {
            return Err(PaymentError::Adapter(
                "Credit memos are disabled".to_string(),
            ));
        }

        let recorded = self
            .ledger
            .record_credit_memo(CreditMemo {
                order_id: order_id.to_string(),
                transaction_id: transaction_id.to_string(),
                amount,
                description: description.to_string(),
            })
            .await?;
        if !recorded {
            tracing::debug!(order_id, transaction_id, "Credit memo already recorded");
        }
        Ok(())
    }

    async fn is_credit_memo_exist(&self, transaction_id: &str) -> Result<bool> {
        self.ledger.credit_memo_exists(transaction_id).await
    }

    async fn save_payment_token(
        &self,
        customer_id: Option<&str>,
        token: &PaymentToken,
        order_id: &str,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.tokens.push(SavedToken {
            customer_id: customer_id.map(str::to_string),
            order_id: order_id.to_string(),
            token: token.clone(),
        });
        Ok(())
    }
}
