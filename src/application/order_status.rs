use super::core::Core;
use crate::domain::order::OrderStatus;
use crate::domain::ports::LogLevel;
use crate::domain::transaction::{FinancialTransaction, TransactionField};
use crate::error::Result;
use rust_decimal::Decimal;
use serde_json::{Value, json};

impl Core {
    pub async fn can_update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        transaction_number: Option<&str>,
    ) -> Result<bool> {
        self.adapter
            .can_update_order_status(order_id, status, transaction_number)
            .await
    }

    pub async fn get_order_status(&self, order_id: &str) -> Result<OrderStatus> {
        self.adapter.get_order_status(order_id).await
    }

    /// Moves the order to `status` unless the adapter's guard rejects it.
    ///
    /// Returns whether the update was applied.
    pub async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        message: Option<&str>,
        transaction_number: Option<&str>,
    ) -> Result<bool> {
        if !self
            .can_update_order_status(order_id, status, transaction_number)
            .await?
        {
            self.log(
                LogLevel::Info,
                &format!("Order #{order_id}: status update to {status} was rejected"),
                json!({ "transaction": transaction_number }),
            );
            return Ok(false);
        }

        self.adapter
            .update_order_status(order_id, status, message, transaction_number)
            .await?;
        self.log(
            LogLevel::Info,
            &format!("Order #{order_id}: status updated to {status}"),
            json!({ "transaction": transaction_number, "message": message }),
        );
        Ok(true)
    }

    /// Notes a transaction that leaves the status unchanged, once per number.
    ///
    /// Returns whether the note was recorded.
    pub async fn record_transaction_note(
        &self,
        order_id: &str,
        message: &str,
        transaction_number: &str,
    ) -> Result<bool> {
        let recorded = self
            .adapter
            .record_transaction_note(order_id, message, transaction_number)
            .await?;
        if !recorded {
            self.log(
                LogLevel::Info,
                &format!("Order #{order_id}: transaction #{transaction_number} was already noted"),
                Value::Null,
            );
        }
        Ok(recorded)
    }

    pub async fn set_payment_id(&self, order_id: &str, payment_id: &str) -> Result<()> {
        self.adapter.set_payment_id(order_id, payment_id).await
    }

    pub async fn set_payment_order_id(&self, order_id: &str, payment_order_id: &str) -> Result<()> {
        self.adapter
            .set_payment_order_id(order_id, payment_order_id)
            .await
    }

    pub async fn add_order_note(&self, order_id: &str, message: &str) -> Result<()> {
        self.adapter.add_order_note(order_id, message).await
    }

    pub async fn is_credit_memo_exist(&self, transaction_id: &str) -> Result<bool> {
        self.adapter.is_credit_memo_exist(transaction_id).await
    }

    /// Records a refund locally, at most once per remote transaction.
    ///
    /// A failing adapter does not fail the caller; the error becomes an order note.
    pub async fn create_credit_memo(
        &self,
        order_id: &str,
        amount: Decimal,
        transaction_id: &str,
        description: &str,
    ) -> Result<()> {
        if self.is_credit_memo_exist(transaction_id).await? {
            self.log(
                LogLevel::Debug,
                &format!("Credit memo for transaction #{transaction_id} already exists"),
                json!({ "order": order_id }),
            );
            return Ok(());
        }

        if let Err(error) = self
            .adapter
            .create_credit_memo(order_id, amount, transaction_id, description)
            .await
        {
            self.log(
                LogLevel::Error,
                &format!("Unable to create credit memo for order #{order_id}: {error}"),
                json!({ "transaction": transaction_id }),
            );
            self.add_order_note(order_id, &format!("Unable to create credit memo. {error}"))
                .await?;
        }
        Ok(())
    }

    pub async fn save_financial_transaction(
        &self,
        order_id: &str,
        transaction: &FinancialTransaction,
    ) -> Result<()> {
        self.adapter
            .save_financial_transaction(order_id, transaction)
            .await
    }

    pub async fn save_financial_transactions(
        &self,
        order_id: &str,
        transactions: &[FinancialTransaction],
    ) -> Result<()> {
        for transaction in transactions {
            self.save_financial_transaction(order_id, transaction).await?;
        }
        Ok(())
    }

    pub async fn find_financial_transaction(
        &self,
        field: TransactionField,
        value: &str,
    ) -> Result<Option<FinancialTransaction>> {
        self.adapter.find_financial_transaction(field, value).await
    }
}
