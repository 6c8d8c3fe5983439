mod common;

use common::*;
use payorch::domain::order::OrderStatus;
use payorch::domain::ports::Method;
use payorch::domain::transaction::{TransactionField, TransactionType};
use payorch::error::PaymentError;
use payorch::infrastructure::fixture::FixtureTransport;
use serde_json::json;

fn financial_transactions() -> String {
    format!("{PAYMENT_ORDER}/financialtransactions")
}

#[tokio::test]
async fn test_financial_transactions_sorted_by_created() {
    let mut late = transaction_json("Capture", 5, 10000, "Completed");
    late["created"] = json!("2023-01-05T12:00:00Z");
    let mut early = transaction_json("Authorization", 4, 10000, "Completed");
    early["created"] = json!("2023-01-05T11:00:00Z");
    let mut tie = transaction_json("Reversal", 6, 1000, "Completed");
    tie["created"] = json!("2023-01-05T12:00:00Z");

    let transport = FixtureTransport::new().with_json(
        Method::Get,
        &financial_transactions(),
        json!({ "financialTransactions": { "financialTransactionsList": [late, early, tie] } }),
    );
    let (core, _) = setup(payment_order_order(), transport).await;

    let list = core
        .fetch_financial_transactions_list(PAYMENT_ORDER, None)
        .await;

    let numbers: Vec<&str> = list.iter().map(|tx| tx.number.as_str()).collect();
    assert_eq!(numbers, vec!["4", "5", "6"]);
}

#[tokio::test]
async fn test_financial_transactions_empty_on_failure() {
    let transport = FixtureTransport::new().with_reply(
        Method::Get,
        &financial_transactions(),
        500,
        "Internal Server Error",
    );
    let (core, _) = setup(payment_order_order(), transport).await;

    assert!(core
        .fetch_financial_transactions_list(PAYMENT_ORDER, None)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_expand_is_appended() {
    let transport = FixtureTransport::new().with_json(
        Method::Get,
        &format!("{PAYMENT_ORDER}?$expand=paid"),
        json!({ "paymentOrder": { "id": PAYMENT_ORDER } }),
    );
    let (core, _) = setup(payment_order_order(), transport).await;

    let response = core.fetch_payment_info(PAYMENT_ORDER, Some("paid")).await.unwrap();
    assert_eq!(response.pointer("paymentOrder/id").unwrap(), PAYMENT_ORDER);
}

#[tokio::test]
async fn test_absolute_urls_are_reduced_to_paths() {
    let transport = FixtureTransport::new().with_json(
        Method::Get,
        PAYMENT_ORDER,
        payment_order_resource(&[]),
    );
    let (core, _) = setup(payment_order_order(), transport.clone()).await;

    core.fetch_payment_info(
        &format!("https://api.externalintegration.payex.com{PAYMENT_ORDER}"),
        None,
    )
    .await
    .unwrap();

    assert_eq!(transport.requests()[0].path, PAYMENT_ORDER);
}

#[tokio::test]
async fn test_empty_target_is_invalid() {
    let (core, _) = setup(payment_order_order(), FixtureTransport::new()).await;
    let result = core.request(Method::Get, "", None).await;
    assert!(matches!(result, Err(PaymentError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_authorization_list_propagates_errors() {
    let (core, _) = setup(legacy_order(), FixtureTransport::new()).await;

    let result = core.fetch_authorization_list(PAYMENT, None).await;
    match result {
        Err(PaymentError::RemoteError { status, .. }) => assert_eq!(status, Some(404)),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_verification_list() {
    let transport = FixtureTransport::new().with_json(
        Method::Get,
        &format!("{PAYMENT}/verifications"),
        json!({
            "verifications": {
                "verificationList": [{
                    "id": format!("{PAYMENT}/verifications/1"),
                    "recurrenceToken": "rt-1",
                    "transaction": transaction_json("Verification", 3, 0, "Completed")
                }]
            }
        }),
    );
    let (core, _) = setup(legacy_order(), transport).await;

    let verifications = core.fetch_verification_list(PAYMENT, None).await.unwrap();
    assert_eq!(verifications.len(), 1);
    assert!(verifications[0].token.has_token());
    assert_eq!(
        verifications[0].transaction.as_ref().unwrap().r#type,
        TransactionType::Verification
    );
}

#[tokio::test]
async fn test_payment_id_by_payment_order() {
    let transport = FixtureTransport::new()
        .with_json(Method::Get, PAYMENT_ORDER, payment_order_resource(&[]))
        .with_json(
            Method::Get,
            &format!("{PAYMENT_ORDER}/currentpayment"),
            json!({ "payment": { "id": PAYMENT, "instrument": "CreditCard" } }),
        );
    let (core, _) = setup(payment_order_order(), transport).await;

    assert_eq!(
        core.get_payment_id_by_payment_order(PAYMENT_ORDER).await.unwrap().as_deref(),
        Some(PAYMENT)
    );
    let current = core
        .get_checkout_current_payment(PAYMENT_ORDER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.instrument.as_deref(), Some("CreditCard"));
}

#[tokio::test]
async fn test_fetch_transactions_and_update_order() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            &financial_transactions(),
            json!({
                "financialTransactions": {
                    "financialTransactionsList": [
                        transaction_json("Authorization", 4, 10000, "Completed"),
                        transaction_json("Capture", 5, 10000, "Completed")
                    ]
                }
            }),
        )
        .with_json(Method::Get, PAYMENT_ORDER, payment_order_resource(&[]));
    let (core, platform) = setup(payment_order_order(), transport).await;

    core.fetch_transactions_and_update_order(ORDER_ID, None)
        .await
        .unwrap();

    let order = platform.order(ORDER_ID).await.unwrap();
    assert_eq!(order.status, OrderStatus::Captured);
    assert_eq!(platform.status_changes(ORDER_ID).await.len(), 2);
    assert!(core
        .find_financial_transaction(TransactionField::PayeeReference, "42x4")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_unknown_transaction_number_fails() {
    let transport = FixtureTransport::new().with_json(
        Method::Get,
        &financial_transactions(),
        json!({ "financialTransactions": { "financialTransactionsList": [] } }),
    );
    let (core, _) = setup(payment_order_order(), transport).await;

    let result = core
        .fetch_transactions_and_update_order(ORDER_ID, Some("99"))
        .await;
    assert!(matches!(result, Err(PaymentError::OperationFailed(_))));
}

#[tokio::test]
async fn test_finalize_synthesises_from_paid_block() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            &format!("{PAYMENT_ORDER}/paid"),
            json!({
                "paid": {
                    "id": format!("{PAYMENT_ORDER}/paid"),
                    "number": 1234,
                    "transactionType": "Authorization",
                    "amount": 10000,
                    "payeeReference": "42xabcde"
                }
            }),
        )
        .with_json(
            Method::Get,
            &financial_transactions(),
            json!({ "financialTransactions": { "financialTransactionsList": [] } }),
        );
    let (core, platform) = setup(payment_order_order(), transport).await;

    core.finalize_payment_order(ORDER_ID, PAYMENT_ORDER).await.unwrap();

    let order = platform.order(ORDER_ID).await.unwrap();
    assert_eq!(order.status, OrderStatus::Authorized);
    assert_eq!(order.transaction_id.as_deref(), Some("1234"));

    let saved = core
        .find_financial_transaction(TransactionField::Number, "1234")
        .await
        .unwrap()
        .unwrap();
    assert!(saved.id.starts_with(&format!("{PAYMENT_ORDER}/financialtransactions/")));
    assert_eq!(saved.payee_reference.as_deref(), Some("42xabcde"));
}

#[tokio::test]
async fn test_finalize_uses_matching_listed_transaction() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            &format!("{PAYMENT_ORDER}/paid"),
            json!({
                "paid": {
                    "number": "5",
                    "transactionType": "Sale",
                    "amount": 10000
                }
            }),
        )
        .with_json(
            Method::Get,
            &financial_transactions(),
            json!({
                "financialTransactions": {
                    "financialTransactionsList": [
                        transaction_json("Sale", 5, 10000, "Completed"),
                        transaction_json("Reversal", 6, 1000, "Completed")
                    ]
                }
            }),
        )
        .with_json(Method::Get, PAYMENT_ORDER, payment_order_resource(&[]));
    let (core, platform) = setup(payment_order_order(), transport).await;

    core.finalize_payment_order(ORDER_ID, PAYMENT_ORDER).await.unwrap();

    let order = platform.order(ORDER_ID).await.unwrap();
    assert_eq!(order.status, OrderStatus::Captured);
    assert_eq!(platform.credited_total(ORDER_ID).await.unwrap().value(), 0);
}

#[tokio::test]
async fn test_listed_failed_transactions_are_skipped() {
    let transport = FixtureTransport::new().with_json(
        Method::Get,
        &financial_transactions(),
        json!({
            "financialTransactions": {
                "financialTransactionsList": [
                    transaction_json("Authorization", 3, 10000, "Failed"),
                    transaction_json("Authorization", 4, 10000, "Completed")
                ]
            }
        }),
    );
    let (core, platform) = setup(payment_order_order(), transport).await;

    core.fetch_transactions_and_update_order(ORDER_ID, None)
        .await
        .unwrap();

    let changes = platform.status_changes(ORDER_ID).await;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].transaction_number.as_deref(), Some("4"));
    assert_eq!(platform.order(ORDER_ID).await.unwrap().status, OrderStatus::Authorized);
}
