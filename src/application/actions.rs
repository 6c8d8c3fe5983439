use super::core::Core;
use crate::domain::money::MinorUnits;
use crate::domain::order::{Order, OrderItem, OrderStatus, PaymentReference, totals_of};
use crate::domain::payment::{ApiResponse, PaymentResource, RemainingKind};
use crate::domain::ports::{LogLevel, Method};
use crate::domain::problem::format_error_message;
use crate::domain::transaction::{FinancialTransaction, TransactionState};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use serde_json::{Value, json};

/// Remaining amounts at or below this are treated as exhausted.
const ELIGIBILITY_THRESHOLD: Decimal = dec!(0.1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Capture,
    Cancel,
    Refund,
}

impl Action {
    fn remaining_kind(self) -> RemainingKind {
        match self {
            Self::Capture => RemainingKind::Capture,
            Self::Cancel => RemainingKind::Cancellation,
            Self::Refund => RemainingKind::Reversal,
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Cancel => "cancellation",
            Self::Refund => "reversal",
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            Self::Capture => "captures",
            Self::Cancel => "cancellations",
            Self::Refund => "reversals",
        }
    }

    fn operation_rel(self) -> &'static str {
        match self {
            Self::Capture => "create-capture",
            Self::Cancel => "create-cancellation",
            Self::Refund => "create-reversal",
        }
    }

    fn unavailable_message(self) -> &'static str {
        match self {
            Self::Capture => "Capturing is not available.",
            Self::Cancel => "Cancellation is not available.",
            Self::Refund => "Refund action is not available.",
        }
    }

    fn failed_message(self) -> &'static str {
        match self {
            Self::Capture => "Capture is failed.",
            Self::Cancel => "Cancellation is failed.",
            Self::Refund => "Refund is failed.",
        }
    }

    fn supports_partial(self) -> bool {
        !matches!(self, Self::Cancel)
    }
}

/// Arguments of a capture, cancel or refund. Empty means "the whole order".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionRequest {
    /// Major units
    pub amount: Option<Decimal>,
    /// Major units
    pub vat_amount: Option<Decimal>,
    pub items: Vec<OrderItem>,
}

impl ActionRequest {
    pub fn amount(amount: Decimal, vat_amount: Decimal) -> Self {
        Self {
            amount: Some(amount),
            vat_amount: Some(vat_amount),
            items: Vec::new(),
        }
    }

    pub fn items(items: Vec<OrderItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTotals {
    pub amount: MinorUnits,
    pub vat_amount: MinorUnits,
    pub items: Vec<OrderItem>,
}

/// Amount and VAT to submit for `request` against `order`.
///
/// Explicit amounts win; a missing VAT next to an explicit amount is zero.
/// Requested items are summed; without them the order totals apply as they
/// are, since an order may carry fees outside its items. The order's items
/// still describe the transaction in that case.
pub fn resolve_totals(order: &Order, request: &ActionRequest) -> ResolvedTotals {
    let (items, (derived_amount, derived_vat)) = if request.items.is_empty() {
        (order.items.clone(), (order.amount, order.vat_amount))
    } else {
        (request.items.clone(), totals_of(&request.items))
    };

    let (amount, vat_amount) = match (request.amount, request.vat_amount) {
        (Some(amount), vat) => (
            MinorUnits::from_major(amount),
            vat.map(MinorUnits::from_major).unwrap_or(MinorUnits::ZERO),
        ),
        (None, Some(vat)) => (derived_amount, MinorUnits::from_major(vat)),
        (None, None) => (derived_amount, derived_vat),
    };

    ResolvedTotals {
        amount,
        vat_amount,
        items,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemDescription {
    amount: MinorUnits,
    description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VatSummary {
    amount: MinorUnits,
    vat_amount: MinorUnits,
    vat_percent: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    activity: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<MinorUnits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vat_amount: Option<MinorUnits>,
    description: String,
    payee_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_items: Option<Vec<OrderItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_descriptions: Option<Vec<ItemDescription>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vat_summary: Option<Vec<VatSummary>>,
}

fn vat_summary(items: &[OrderItem]) -> Vec<VatSummary> {
    let mut summary: Vec<VatSummary> = Vec::new();
    for item in items {
        match summary.iter_mut().find(|s| s.vat_percent == item.vat_percent) {
            Some(entry) => {
                entry.amount += item.amount;
                entry.vat_amount += item.vat_amount;
            }
            None => summary.push(VatSummary {
                amount: item.amount,
                vat_amount: item.vat_amount,
                vat_percent: item.vat_percent,
            }),
        }
    }
    summary
}

fn transaction_body(
    action: Action,
    reference: &PaymentReference,
    invoice: bool,
    order: &Order,
    totals: &ResolvedTotals,
    payee_reference: String,
) -> TransactionBody {
    let description = match action {
        Action::Capture => format!("Capture for Order #{}", order.order_id),
        Action::Cancel => format!("Cancellation for Order #{}", order.order_id),
        Action::Refund => format!(
            "Refund for Order #{}. Amount: {}",
            order.order_id,
            totals.amount.to_major()
        ),
    };

    let mut body = TransactionBody {
        activity: invoice.then_some("FinancingConsumer"),
        amount: None,
        vat_amount: None,
        description,
        payee_reference: payee_reference.clone(),
        receipt_reference: None,
        order_items: None,
        item_descriptions: None,
        vat_summary: None,
    };

    if action == Action::Cancel {
        return body;
    }

    body.amount = Some(totals.amount);
    body.vat_amount = Some(totals.vat_amount);

    match reference {
        PaymentReference::PaymentOrder(_) => {
            body.receipt_reference = Some(payee_reference);
            if !totals.items.is_empty() {
                body.order_items = Some(totals.items.clone());
            }
        }
        PaymentReference::Payment(_) if invoice => {
            body.receipt_reference = Some(payee_reference);
            body.item_descriptions = Some(
                totals
                    .items
                    .iter()
                    .map(|item| ItemDescription {
                        amount: item.amount,
                        description: item.name.clone(),
                    })
                    .collect(),
            );
            body.vat_summary = Some(vat_summary(&totals.items));
        }
        PaymentReference::Payment(_) => {}
    }

    body
}

impl Core {
    pub async fn can_capture(&self, order_id: &str) -> bool {
        self.is_action_available(order_id, Action::Capture).await
    }

    pub async fn can_cancel(&self, order_id: &str) -> bool {
        self.is_action_available(order_id, Action::Cancel).await
    }

    pub async fn can_refund(&self, order_id: &str) -> bool {
        self.is_action_available(order_id, Action::Refund).await
    }

    /// Whether the remote reports more than the threshold left for `action`.
    ///
    /// Any failure to find out counts as "not available".
    async fn is_action_available(&self, order_id: &str, action: Action) -> bool {
        let resource = async {
            let order = self.get_order(order_id).await?;
            let resource = self.fetch_payment_resource(&order.payment_reference()?).await?;
            Ok::<PaymentResource, PaymentError>(resource)
        };

        match resource.await {
            Ok(resource) => resource
                .remaining(action.remaining_kind())
                .is_some_and(|remaining| remaining > ELIGIBILITY_THRESHOLD),
            Err(error) => {
                self.log(
                    LogLevel::Debug,
                    &format!("Unable to check {} availability for order #{order_id}: {error}", action.noun()),
                    Value::Null,
                );
                false
            }
        }
    }

    /// Captures funds of an order, fully or partially.
    pub async fn capture(&self, order_id: &str, request: ActionRequest) -> Result<ApiResponse> {
        self.execute_action(order_id, Action::Capture, request).await
    }

    /// Cancels the authorized, uncaptured amount. Partial amounts are rejected.
    pub async fn cancel(&self, order_id: &str, request: ActionRequest) -> Result<ApiResponse> {
        self.execute_action(order_id, Action::Cancel, request).await
    }

    /// Refunds captured funds, fully or partially.
    pub async fn refund(&self, order_id: &str, request: ActionRequest) -> Result<ApiResponse> {
        self.execute_action(order_id, Action::Refund, request).await
    }

    async fn execute_action(
        &self,
        order_id: &str,
        action: Action,
        request: ActionRequest,
    ) -> Result<ApiResponse> {
        let order = self.get_order(order_id).await?;
        let reference = order.payment_reference()?;
        let totals = resolve_totals(&order, &request);

        if !action.supports_partial()
            && (totals.amount != order.amount || totals.vat_amount != order.vat_amount)
        {
            return Err(PaymentError::PartialNotSupported(format!(
                "Partial {} isn't available.",
                action.noun()
            )));
        }

        if !self.is_action_available(order_id, action).await {
            return Err(PaymentError::ActionUnavailable(
                action.unavailable_message().to_string(),
            ));
        }

        let (target, invoice) = match &reference {
            PaymentReference::PaymentOrder(url) => (format!("{url}/{}", action.endpoint()), false),
            PaymentReference::Payment(url) => {
                let info = self.fetch_payment_info(url, None).await?;
                let resource: PaymentResource = info.extract("payment")?;
                let href = info.operation_by_rel(action.operation_rel()).ok_or_else(|| {
                    PaymentError::ActionUnavailable(action.unavailable_message().to_string())
                })?;
                (href, resource.is_invoice())
            }
        };

        let payee_reference = self.generate_payee_reference(order_id).await?;
        let body = transaction_body(action, &reference, invoice, &order, &totals, payee_reference);
        let params = self
            .adapter
            .process_transaction_object(json!({ "transaction": body }), order_id);

        let response = match self.request(Method::Post, &target, Some(params)).await {
            Ok(response) => response,
            Err(error) => return Err(self.normalize_action_error(order_id, action, error)),
        };

        let transaction: FinancialTransaction =
            response.extract(&format!("{}/transaction", action.noun()))?;

        match &transaction.state {
            TransactionState::Failed => {
                return Err(PaymentError::OperationFailed(
                    transaction.failure_message(action.failed_message()),
                ));
            }
            TransactionState::Other(_) => {
                return Err(PaymentError::OperationFailed(
                    action.failed_message().to_string(),
                ));
            }
            _ => {}
        }

        self.save_financial_transaction(order_id, &transaction).await?;

        if transaction.state.is_pending() {
            self.add_order_note(
                order_id,
                &format!(
                    "Transaction {} status: {}. Amount: {}",
                    action.noun(),
                    transaction.state,
                    transaction.amount.to_major()
                ),
            )
            .await?;
        } else {
            self.process_financial_transaction(order_id, &transaction)
                .await?;
        }

        Ok(response)
    }

    /// Re-renders a remote rejection with [`format_error_message`].
    fn normalize_action_error(&self, order_id: &str, action: Action, error: PaymentError) -> PaymentError {
        self.log(
            LogLevel::Debug,
            &format!("{} of order #{order_id} was rejected: {error}", action.noun()),
            Value::Null,
        );

        match error {
            PaymentError::RemoteError {
                status,
                problems,
                body: Some(body),
                ..
            } => PaymentError::RemoteError {
                message: format_error_message(&body),
                status,
                problems,
                body: Some(body),
            },
            other => other,
        }
    }

    /// Aborts a payment or payment order that has not been paid yet.
    pub async fn abort(&self, order_id: &str) -> Result<ApiResponse> {
        let order = self.get_order(order_id).await?;
        let reference = order.payment_reference()?;
        let (rel, key) = match &reference {
            PaymentReference::PaymentOrder(_) => ("update-paymentorder-abort", "paymentorder"),
            PaymentReference::Payment(_) => ("update-payment-abort", "payment"),
        };

        let info = self.fetch_payment_info(reference.url(), None).await?;
        let href = info.operation_by_rel(rel).ok_or_else(|| {
            PaymentError::ActionUnavailable("Abort is not available.".to_string())
        })?;

        let params = self.adapter.process_payment_object(
            json!({ key: { "operation": "Abort", "abortReason": "CancelledByConsumer" } }),
            order_id,
        );
        let response = self.request(Method::Patch, &href, Some(params)).await?;

        let aborted = [reference.resource_key(), key]
            .iter()
            .flat_map(|k| ["state", "status"].map(|field| format!("{k}/{field}")))
            .any(|path| response.pointer(&path).and_then(Value::as_str) == Some("Aborted"));

        if !aborted {
            return Err(PaymentError::OperationFailed("Aborting is failed.".to_string()));
        }

        self.update_order_status(order_id, OrderStatus::Cancelled, Some("Payment aborted"), None)
            .await?;
        Ok(response)
    }
}
