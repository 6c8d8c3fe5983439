use super::money::MinorUnits;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an order as seen by the payment core.
///
/// Independent of the hosting platform's own statuses; adapters map between
/// the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Payment initiated, nothing confirmed yet
    #[default]
    Pending,
    /// Funds reserved
    Authorized,
    /// Funds (fully) captured
    Captured,
    Cancelled,
    Refunded,
    Failed,
    /// A platform status the core cannot represent
    Unknown,
}

impl OrderStatus {
    /// Whether the reconciliation loop applies to this status.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Authorized => write!(f, "authorized"),
            Self::Captured => write!(f, "captured"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Refunded => write!(f, "refunded"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "authorized" => Ok(Self::Authorized),
            "captured" => Ok(Self::Captured),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            "failed" => Ok(Self::Failed),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid order status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderItemType {
    Product,
    Service,
    ShippingFee,
    PaymentFee,
    Discount,
    ValueCode,
    Other,
}

/// One order line, amounts in minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub reference: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: OrderItemType,
    #[serde(default = "default_item_class")]
    pub class: String,
    pub quantity: Decimal,
    #[serde(default = "default_quantity_unit")]
    pub quantity_unit: String,
    pub unit_price: MinorUnits,
    /// VAT rate in hundredths of a percent (`2500` = 25%)
    pub vat_percent: i64,
    pub amount: MinorUnits,
    pub vat_amount: MinorUnits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_item_class() -> String {
    "ProductGroup1".to_string()
}

fn default_quantity_unit() -> String {
    "pcs".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street_address: Option<String>,
    pub co_address: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Payer {
    pub customer_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
}

/// Which remote resource an order is paid through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReference {
    /// A payment order container (redirect or seamless checkout).
    PaymentOrder(String),
    /// A single legacy payment, invoice payments included.
    Payment(String),
}

impl PaymentReference {
    pub fn url(&self) -> &str {
        match self {
            Self::PaymentOrder(url) | Self::Payment(url) => url,
        }
    }

    /// Key of the resource body inside a fetched response.
    pub fn resource_key(&self) -> &'static str {
        match self {
            Self::PaymentOrder(_) => "paymentOrder",
            Self::Payment(_) => "payment",
        }
    }
}

/// Read-mostly view of an order, sourced from the platform adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub currency: String,
    pub amount: MinorUnits,
    pub vat_amount: MinorUnits,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payer: Payer,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub payment_order_id: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    /// Latest processor transaction number applied to the order
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub needs_save_token: bool,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// The remote resource this order is attached to.
    ///
    /// A payment order takes precedence over a payment: the payment id of a
    /// payment-order checkout is only the currently active attempt.
    pub fn payment_reference(&self) -> Result<PaymentReference> {
        if let Some(id) = self.payment_order_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(PaymentReference::PaymentOrder(id.to_string()));
        }
        if let Some(id) = self.payment_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(PaymentReference::Payment(id.to_string()));
        }
        Err(PaymentError::MissingReference(format!(
            "Unable to get the payment reference of order #{}",
            self.order_id
        )))
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.payer.customer_id.as_deref()
    }
}

/// Sum of the line amounts and VAT amounts.
pub fn totals_of(items: &[OrderItem]) -> (MinorUnits, MinorUnits) {
    (
        items.iter().map(|i| i.amount).sum(),
        items.iter().map(|i| i.vat_amount).sum(),
    )
}

/// Merchant callback URLs for an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformUrls {
    pub complete_url: Option<String>,
    pub cancel_url: Option<String>,
    pub callback_url: Option<String>,
    pub terms_url: Option<String>,
}

/// Payee information attached to outgoing requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayeeInfo {
    pub payee_id: Option<String>,
    pub payee_name: Option<String>,
    pub payee_reference: Option<String>,
    pub order_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsite: Option<String>,
}

impl PayeeInfo {
    /// Fills every field left empty in `self` from `defaults`.
    pub fn merged_over(self, defaults: PayeeInfo) -> PayeeInfo {
        PayeeInfo {
            payee_id: self.payee_id.or(defaults.payee_id),
            payee_name: self.payee_name.or(defaults.payee_name),
            payee_reference: self.payee_reference.or(defaults.payee_reference),
            order_reference: self.order_reference.or(defaults.order_reference),
            subsite: self.subsite.or(defaults.subsite),
        }
    }
}
