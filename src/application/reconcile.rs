use super::core::Core;
use crate::domain::order::PaymentReference;
use crate::domain::ports::LogLevel;
use crate::domain::transaction::TransactionState;
use crate::error::Result;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounds of the failed-order reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order is not Failed; nothing was polled.
    NotApplicable,
    /// A completed authorization or sale was found and applied.
    Resolved {
        transaction_number: String,
        attempts: u32,
    },
    /// The attempt budget ran out.
    Exhausted { attempts: u32 },
    /// The caller cancelled the loop.
    Cancelled { attempts: u32 },
}

impl Core {
    /// Polls a Failed order's payment until a completed authorization or sale
    /// appears, with the default policy.
    pub async fn update_transactions_on_failure(
        &self,
        order_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        self.update_transactions_on_failure_with(order_id, ReconcilePolicy::default(), cancel)
            .await
    }

    pub async fn update_transactions_on_failure_with(
        &self,
        order_id: &str,
        policy: ReconcilePolicy,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let order = self.get_order(order_id).await?;
        if !order.status.needs_reconciliation() {
            return Ok(ReconcileOutcome::NotApplicable);
        }
        let reference = order.payment_reference()?;

        let mut attempts = 0;
        while attempts < policy.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.log(
                        LogLevel::Info,
                        &format!("Reconciliation of order #{order_id} cancelled"),
                        json!({ "attempts": attempts }),
                    );
                    return Ok(ReconcileOutcome::Cancelled { attempts });
                }
                _ = self.sleeper.sleep(policy.interval) => {}
            }
            attempts += 1;

            let payment_id = match self.current_payment_id(&reference, order.payment_id.as_deref()).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    self.log(
                        LogLevel::Debug,
                        &format!("Order #{order_id} has no active payment yet"),
                        json!({ "attempt": attempts }),
                    );
                    continue;
                }
                Err(error) => {
                    self.log(
                        LogLevel::Warning,
                        &format!("Unable to resolve the payment of order #{order_id}: {error}"),
                        json!({ "attempt": attempts }),
                    );
                    continue;
                }
            };

            let transactions = match self.fetch_transactions_list(&payment_id, None).await {
                Ok(transactions) => transactions,
                Err(error) => {
                    self.log(
                        LogLevel::Warning,
                        &format!("Unable to fetch transactions of {payment_id}: {error}"),
                        json!({ "attempt": attempts }),
                    );
                    continue;
                }
            };

            for transaction in transactions.iter().filter(|tx| tx.r#type.settles_payment()) {
                match transaction.state {
                    TransactionState::Completed => {
                        if let PaymentReference::PaymentOrder(_) = reference {
                            self.set_payment_id(order_id, &payment_id).await?;
                        }
                        self.fetch_transactions_and_update_order(order_id, Some(&transaction.number))
                            .await?;
                        self.log(
                            LogLevel::Info,
                            &format!(
                                "Order #{order_id} reconciled with transaction #{}",
                                transaction.number
                            ),
                            json!({ "attempts": attempts }),
                        );
                        return Ok(ReconcileOutcome::Resolved {
                            transaction_number: transaction.number.clone(),
                            attempts,
                        });
                    }
                    TransactionState::Failed => {
                        self.log(
                            LogLevel::Warning,
                            &format!(
                                "Transaction #{} of order #{order_id} has failed: {}",
                                transaction.number,
                                transaction.failure_message("no reason given")
                            ),
                            json!({ "attempt": attempts }),
                        );
                    }
                    _ => {}
                }
            }
        }

        self.log(
            LogLevel::Info,
            &format!("Reconciliation of order #{order_id} gave up"),
            json!({ "attempts": attempts }),
        );
        Ok(ReconcileOutcome::Exhausted { attempts })
    }

    async fn current_payment_id(
        &self,
        reference: &PaymentReference,
        payment_id: Option<&str>,
    ) -> Result<Option<String>> {
        match reference {
            PaymentReference::PaymentOrder(url) => self.get_payment_id_by_payment_order(url).await,
            PaymentReference::Payment(url) => Ok(Some(
                payment_id
                    .filter(|id| !id.is_empty())
                    .unwrap_or(url)
                    .to_string(),
            )),
        }
    }
}
