use super::core::Core;
use crate::domain::order::{Order, OrderStatus, PaymentReference};
use crate::domain::payment::RemainingKind;
use crate::domain::ports::LogLevel;
use crate::domain::transaction::{
    FinancialTransaction, TransactionField, TransactionState, TransactionType,
};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// The `paid` block of a payment order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaidBlock {
    #[serde(default)]
    id: String,
    number: serde_json::Value,
    transaction_type: String,
    amount: crate::domain::money::MinorUnits,
    #[serde(default)]
    payee_reference: Option<String>,
}

fn number_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Core {
    /// Applies one remote transaction to its order.
    ///
    /// Only `Completed` transactions change anything; failed, pending and
    /// unrecognised states are logged and skipped. Replays of an already
    /// applied transaction number are detected through the adapter's guard
    /// before any side effect and return `Ok(())`.
    pub async fn process_financial_transaction(
        &self,
        order_id: &str,
        transaction: &FinancialTransaction,
    ) -> Result<()> {
        self.log(
            LogLevel::Debug,
            &format!(
                "Process transaction #{} ({}) for order #{order_id}",
                transaction.number, transaction.r#type
            ),
            serde_json::to_value(transaction)?,
        );

        let target = match &transaction.r#type {
            TransactionType::Verification => return Ok(()),
            TransactionType::Authorization => OrderStatus::Authorized,
            TransactionType::Capture | TransactionType::Sale => OrderStatus::Captured,
            TransactionType::Cancellation => OrderStatus::Cancelled,
            TransactionType::Reversal => OrderStatus::Refunded,
            TransactionType::Other(name) => {
                return Err(PaymentError::UnknownTransactionType(name.clone()));
            }
        };

        let number = transaction.number.as_str();
        match &transaction.state {
            TransactionState::Completed => {}
            TransactionState::Failed => {
                self.log(
                    LogLevel::Warning,
                    &format!(
                        "Transaction #{number} of order #{order_id} has failed: {}",
                        transaction.failure_message("no reason given")
                    ),
                    json!({ "type": transaction.r#type.as_str() }),
                );
                return Ok(());
            }
            state => {
                self.log(
                    LogLevel::Info,
                    &format!("Transaction #{number} of order #{order_id} is not completed yet ({state:?})"),
                    json!({ "type": transaction.r#type.as_str() }),
                );
                return Ok(());
            }
        }

        if !self
            .can_update_order_status(order_id, target, Some(number))
            .await?
        {
            self.log(
                LogLevel::Warning,
                &format!("Transaction #{number} has already been applied to order #{order_id}"),
                json!({ "type": transaction.r#type.as_str() }),
            );
            return Ok(());
        }

        let order = self.get_order(order_id).await?;
        match &transaction.r#type {
            TransactionType::Authorization => self.apply_authorization(&order, transaction).await,
            TransactionType::Capture | TransactionType::Sale => {
                self.apply_capture(&order, transaction).await
            }
            TransactionType::Cancellation => {
                self.update_order_status(
                    order_id,
                    OrderStatus::Cancelled,
                    Some(&format!("Payment has been cancelled. Transaction: {number}")),
                    Some(number),
                )
                .await?;
                Ok(())
            }
            TransactionType::Reversal => self.apply_reversal(&order, transaction).await,
            TransactionType::Verification | TransactionType::Other(_) => Ok(()),
        }
    }

    async fn apply_authorization(&self, order: &Order, transaction: &FinancialTransaction) -> Result<()> {
        let number = transaction.number.as_str();
        let message = format!("Payment has been authorized. Transaction: {number}");

        if order.status == OrderStatus::Captured {
            self.record_transaction_note(&order.order_id, &message, number)
                .await?;
        } else {
            self.update_order_status(
                &order.order_id,
                OrderStatus::Authorized,
                Some(&message),
                Some(number),
            )
            .await?;
        }

        if order.needs_save_token {
            if let Err(error) = self.save_authorization_token(order).await {
                self.log(
                    LogLevel::Warning,
                    &format!("Unable to save the payment token of order #{}: {error}", order.order_id),
                    json!({ "transaction": number }),
                );
            }
        }
        Ok(())
    }

    async fn save_authorization_token(&self, order: &Order) -> Result<()> {
        let Some(payment_id) = order.payment_id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(());
        };

        let authorizations = self.fetch_authorization_list(payment_id, None).await?;
        let Some(token) = authorizations
            .into_iter()
            .map(|authorization| authorization.token)
            .find(|token| token.has_token())
        else {
            return Ok(());
        };

        self.adapter
            .save_payment_token(order.customer_id(), &token, &order.order_id)
            .await?;
        self.add_order_note(
            &order.order_id,
            &format!(
                "Card {} has been saved.",
                token.masked_pan.as_deref().unwrap_or_default()
            ),
        )
        .await
    }

    async fn apply_capture(&self, order: &Order, transaction: &FinancialTransaction) -> Result<()> {
        let number = transaction.number.as_str();
        let amount = transaction.amount.to_major();

        if self.is_fully_consumed(order, RemainingKind::Capture).await? {
            self.update_order_status(
                &order.order_id,
                OrderStatus::Captured,
                Some(&format!(
                    "Payment has been captured. Transaction: {number}. Amount: {amount}"
                )),
                Some(number),
            )
            .await?;
        } else {
            self.record_transaction_note(
                &order.order_id,
                &format!("Payment has been partially captured: Transaction: {number}. Amount: {amount}"),
                number,
            )
            .await?;
        }
        Ok(())
    }

    async fn apply_reversal(&self, order: &Order, transaction: &FinancialTransaction) -> Result<()> {
        let number = transaction.number.as_str();
        let amount = transaction.amount.to_major();

        self.create_credit_memo(&order.order_id, amount, number, &transaction.description)
            .await?;

        if self.is_fully_consumed(order, RemainingKind::Reversal).await? {
            self.update_order_status(
                &order.order_id,
                OrderStatus::Refunded,
                Some(&format!(
                    "Payment has been refunded. Transaction: {number}. Amount: {amount}"
                )),
                Some(number),
            )
            .await?;
        } else {
            self.record_transaction_note(
                &order.order_id,
                &format!("Payment has been partially refunded: Transaction: {number}. Amount: {amount}"),
                number,
            )
            .await?;
        }
        Ok(())
    }

    /// Whether the remote resource no longer reports a remaining amount of `kind`.
    async fn is_fully_consumed(&self, order: &Order, kind: RemainingKind) -> Result<bool> {
        let reference = order.payment_reference()?;
        let resource = self.fetch_payment_resource(&reference).await?;
        Ok(resource.remaining(kind).is_none())
    }

    /// Fetches the remote transaction list of an order, persists it and
    /// applies it, optionally narrowed to one transaction number.
    pub async fn fetch_transactions_and_update_order(
        &self,
        order_id: &str,
        transaction_number: Option<&str>,
    ) -> Result<()> {
        let order = self.get_order(order_id).await?;
        let transactions = match order.payment_reference()? {
            PaymentReference::PaymentOrder(url) => {
                self.fetch_financial_transactions_list(&url, None).await
            }
            PaymentReference::Payment(url) => self.fetch_transactions_list(&url, None).await?,
        };

        self.save_financial_transactions(order_id, &transactions).await?;

        let selected = match transaction_number {
            Some(number) => {
                let transaction = self
                    .find_financial_transaction(TransactionField::Number, number)
                    .await?
                    .ok_or_else(|| {
                        PaymentError::OperationFailed(format!(
                            "Failed to fetch transaction number #{number}"
                        ))
                    })?;
                vec![transaction]
            }
            None => transactions,
        };

        for transaction in &selected {
            if let Err(error) = self.process_financial_transaction(order_id, transaction).await {
                self.log(
                    LogLevel::Error,
                    &format!(
                        "Unable to process transaction #{} of order #{order_id}: {error}",
                        transaction.number
                    ),
                    json!({ "type": transaction.r#type.as_str() }),
                );
            }
        }
        Ok(())
    }

    /// Applies the transaction that paid a payment order.
    ///
    /// When the remote list is still empty, a transaction is synthesised from
    /// the `paid` block.
    pub async fn finalize_payment_order(&self, order_id: &str, payment_order_url: &str) -> Result<()> {
        let response = self
            .fetch_payment_info(&format!("{payment_order_url}/paid"), None)
            .await?;
        let paid: PaidBlock = response.extract("paid")?;
        let paid_number = number_text(&paid.number);

        let transactions = self
            .fetch_financial_transactions_list(payment_order_url, None)
            .await;

        if !transactions.is_empty() {
            for transaction in transactions.iter().filter(|tx| tx.number == paid_number) {
                self.save_financial_transaction(order_id, transaction).await?;
                self.process_financial_transaction(order_id, transaction)
                    .await?;
            }
            return Ok(());
        }

        self.log(
            LogLevel::Debug,
            &format!("No financial transactions yet for {payment_order_url}; using the paid block"),
            json!({ "number": paid_number }),
        );

        let now = Utc::now();
        let transaction = FinancialTransaction {
            id: format!("{payment_order_url}/financialtransactions/{}", Uuid::new_v4()),
            created: now,
            updated: Some(now),
            r#type: TransactionType::from(paid.transaction_type),
            state: TransactionState::Completed,
            number: paid_number,
            amount: paid.amount,
            vat_amount: Default::default(),
            description: paid.id,
            payee_reference: paid.payee_reference,
            receipt_reference: None,
            failed_reason: None,
        };

        self.save_financial_transaction(order_id, &transaction).await?;
        self.process_financial_transaction(order_id, &transaction)
            .await
    }
}
