#![allow(dead_code)]

use chrono::{DateTime, Utc};
use payorch::application::core::Core;
use payorch::config::Configuration;
use payorch::domain::money::MinorUnits;
use payorch::domain::order::{Order, OrderItem, OrderItemType};
use payorch::domain::transaction::{FinancialTransaction, TransactionState, TransactionType};
use payorch::infrastructure::fixture::FixtureTransport;
use payorch::infrastructure::in_memory::InMemoryPlatform;
use payorch::infrastructure::sleeper::NoopSleeper;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

pub const ORDER_ID: &str = "42";
pub const PAYMENT_ORDER: &str = "/psp/paymentorders/1";
pub const PAYMENT: &str = "/psp/creditcard/payments/1";

pub fn item(reference: &str, amount: i64, vat_amount: i64) -> OrderItem {
    OrderItem {
        reference: reference.to_string(),
        name: format!("Item {reference}"),
        item_type: OrderItemType::Product,
        class: "ProductGroup1".to_string(),
        quantity: dec!(1),
        quantity_unit: "pcs".to_string(),
        unit_price: MinorUnits::new(amount),
        vat_percent: 2500,
        amount: MinorUnits::new(amount),
        vat_amount: MinorUnits::new(vat_amount),
        description: None,
    }
}

/// A 100.00 / VAT 20.00 order paid through a payment order.
pub fn payment_order_order() -> Order {
    Order {
        order_id: ORDER_ID.to_string(),
        currency: "SEK".to_string(),
        amount: MinorUnits::new(10000),
        vat_amount: MinorUnits::new(2000),
        description: "Order #42".to_string(),
        payer: Default::default(),
        payment_id: None,
        payment_order_id: Some(PAYMENT_ORDER.to_string()),
        status: Default::default(),
        transaction_id: None,
        needs_save_token: false,
        items: vec![item("a", 6000, 1200), item("b", 4000, 800)],
    }
}

/// The same order paid through a legacy payment.
pub fn legacy_order() -> Order {
    Order {
        payment_id: Some(PAYMENT.to_string()),
        payment_order_id: None,
        ..payment_order_order()
    }
}

pub fn created(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_672_916_400 + seconds, 0).unwrap_or_default()
}

pub fn transaction(r#type: TransactionType, number: &str, amount: i64) -> FinancialTransaction {
    FinancialTransaction {
        id: format!("{PAYMENT_ORDER}/financialtransactions/{number}"),
        created: created(number.parse().unwrap_or(0)),
        updated: None,
        r#type,
        state: TransactionState::Completed,
        number: number.to_string(),
        amount: MinorUnits::new(amount),
        vat_amount: MinorUnits::new(amount / 5),
        description: format!("Transaction {number}"),
        payee_reference: Some(format!("42x{number}")),
        receipt_reference: None,
        failed_reason: None,
    }
}

pub fn transaction_json(r#type: &str, number: u64, amount: i64, state: &str) -> Value {
    json!({
        "id": format!("{PAYMENT_ORDER}/financialtransactions/{number}"),
        "created": format!("2023-01-05T10:{:02}:00Z", number % 60),
        "type": r#type,
        "state": state,
        "number": number,
        "amount": amount,
        "vatAmount": amount / 5,
        "description": format!("{type} {number}"),
        "payeeReference": format!("42x{number}")
    })
}

/// A payment order resource with the given remaining amounts.
pub fn payment_order_resource(remaining: &[(&str, i64)]) -> Value {
    let mut resource = json!({
        "id": PAYMENT_ORDER,
        "currentPayment": { "id": format!("{PAYMENT_ORDER}/currentpayment") }
    });
    for (field, amount) in remaining {
        resource[*field] = json!(amount);
    }
    json!({ "paymentOrder": resource })
}

pub fn payment_resource(remaining: &[(&str, i64)], instrument: &str) -> Value {
    let mut resource = json!({ "id": PAYMENT, "instrument": instrument, "state": "Ready" });
    for (field, amount) in remaining {
        resource[*field] = json!(amount);
    }
    json!({
        "payment": resource,
        "operations": [
            { "rel": "create-capture", "href": format!("https://api.externalintegration.payex.com{PAYMENT}/captures"), "method": "POST" },
            { "rel": "create-cancellation", "href": format!("https://api.externalintegration.payex.com{PAYMENT}/cancellations"), "method": "POST" },
            { "rel": "create-reversal", "href": format!("https://api.externalintegration.payex.com{PAYMENT}/reversals"), "method": "POST" },
            { "rel": "update-payment-abort", "href": format!("https://api.externalintegration.payex.com{PAYMENT}"), "method": "PATCH" }
        ]
    })
}

/// A core over `order` and `transport`, with an instant sleeper.
pub async fn setup(order: Order, transport: FixtureTransport) -> (Core, InMemoryPlatform) {
    let platform = InMemoryPlatform::new();
    platform.insert_order(order).await;

    let core = Core::new(
        Configuration {
            payee_id: "payee-1".to_string(),
            payee_name: "Test shop".to_string(),
            ..Default::default()
        },
        Box::new(platform.clone()),
        Box::new(transport),
    )
    .with_sleeper(Box::new(NoopSleeper));

    (core, platform)
}
