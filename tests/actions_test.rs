mod common;

use common::*;
use payorch::application::actions::ActionRequest;
use payorch::domain::money::MinorUnits;
use payorch::domain::order::OrderStatus;
use payorch::domain::ports::Method;
use payorch::error::PaymentError;
use payorch::infrastructure::fixture::FixtureTransport;
use rust_decimal_macros::dec;
use serde_json::json;

fn captures() -> String {
    format!("{PAYMENT_ORDER}/captures")
}

#[tokio::test]
async fn test_eligibility_threshold() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[
                ("remainingCaptureAmount", 10000),
                ("remainingCancellationAmount", 0),
            ]),
        );
    let (core, _) = setup(payment_order_order(), transport).await;

    assert!(core.can_capture(ORDER_ID).await);
    assert!(!core.can_cancel(ORDER_ID).await);
    assert!(!core.can_refund(ORDER_ID).await);
}

#[tokio::test]
async fn test_eligibility_false_when_remote_fails() {
    let (core, _) = setup(payment_order_order(), FixtureTransport::new()).await;
    assert!(!core.can_capture(ORDER_ID).await);
}

#[tokio::test]
async fn test_capture_full_order() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCaptureAmount", 10000)]),
        )
        .with_json(Method::Get, PAYMENT_ORDER, payment_order_resource(&[]))
        .with_json(
            Method::Post,
            &captures(),
            json!({ "payment": PAYMENT_ORDER, "capture": { "transaction": transaction_json("Capture", 5, 10000, "Completed") } }),
        );
    let (core, platform) = setup(payment_order_order(), transport.clone()).await;

    core.capture(ORDER_ID, ActionRequest::default()).await.unwrap();

    let order = platform.order(ORDER_ID).await.unwrap();
    assert_eq!(order.status, OrderStatus::Captured);
    assert_eq!(order.transaction_id.as_deref(), Some("5"));

    let post = transport
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    let body = post.body.unwrap();
    assert_eq!(body["transaction"]["amount"], 10000);
    assert_eq!(body["transaction"]["vatAmount"], 2000);
    assert_eq!(body["transaction"]["description"], "Capture for Order #42");
    assert_eq!(body["transaction"]["orderItems"].as_array().unwrap().len(), 2);
    assert!(post.user_agent.starts_with("payorch/"));

    assert!(core
        .find_financial_transaction(payorch::domain::transaction::TransactionField::Number, "5")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_capture_unavailable_makes_no_request() {
    let transport = FixtureTransport::new().with_json(
        Method::Get,
        PAYMENT_ORDER,
        payment_order_resource(&[("remainingCaptureAmount", 0)]),
    );
    let (core, platform) = setup(payment_order_order(), transport.clone()).await;

    let result = core.capture(ORDER_ID, ActionRequest::default()).await;

    assert!(matches!(result, Err(PaymentError::ActionUnavailable(ref m)) if m == "Capturing is not available."));
    assert_eq!(transport.count(Method::Post, &captures()), 0);
    assert!(platform.notes(ORDER_ID).await.is_empty());
}

#[tokio::test]
async fn test_failed_capture_reports_reason() {
    let mut failed = transaction_json("Capture", 5, 10000, "Failed");
    failed["failedReason"] = json!("insufficient_funds");

    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCaptureAmount", 10000)]),
        )
        .with_json(Method::Post, &captures(), json!({ "capture": { "transaction": failed } }));
    let (core, platform) = setup(payment_order_order(), transport).await;

    let result = core.capture(ORDER_ID, ActionRequest::default()).await;

    match result {
        Err(PaymentError::OperationFailed(message)) => assert_eq!(message, "insufficient_funds"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(platform.order(ORDER_ID).await.unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_unrecognised_state_fails() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCaptureAmount", 10000)]),
        )
        .with_json(
            Method::Post,
            &captures(),
            json!({ "capture": { "transaction": transaction_json("Capture", 5, 10000, "Weird") } }),
        );
    let (core, _) = setup(payment_order_order(), transport).await;

    let result = core.capture(ORDER_ID, ActionRequest::default()).await;
    assert!(matches!(result, Err(PaymentError::OperationFailed(ref m)) if m == "Capture is failed."));
}

#[tokio::test]
async fn test_pending_capture_is_noted_without_transition() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCaptureAmount", 10000)]),
        )
        .with_json(
            Method::Post,
            &captures(),
            json!({ "capture": { "transaction": transaction_json("Capture", 5, 10000, "AwaitingActivity") } }),
        );
    let (core, platform) = setup(payment_order_order(), transport).await;

    core.capture(ORDER_ID, ActionRequest::default()).await.unwrap();

    assert_eq!(platform.order(ORDER_ID).await.unwrap().status, OrderStatus::Pending);
    assert_eq!(
        platform.notes(ORDER_ID).await,
        vec!["Transaction capture status: AwaitingActivity. Amount: 100.00".to_string()]
    );
}

#[tokio::test]
async fn test_partial_cancel_is_rejected_before_any_request() {
    let transport = FixtureTransport::new();
    let (core, _) = setup(payment_order_order(), transport.clone()).await;

    let result = core
        .cancel(ORDER_ID, ActionRequest::amount(dec!(30.00), dec!(6.00)))
        .await;

    assert!(matches!(result, Err(PaymentError::PartialNotSupported(_))));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_partial_refund_submits_requested_amount() {
    let reversals = format!("{PAYMENT_ORDER}/reversals");
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingReversalAmount", 10000)]),
        )
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingReversalAmount", 7000)]),
        )
        .with_json(
            Method::Post,
            &reversals,
            json!({ "reversal": { "transaction": transaction_json("Reversal", 6, 3000, "Completed") } }),
        );
    let mut order = payment_order_order();
    order.status = OrderStatus::Captured;
    let (core, platform) = setup(order, transport.clone()).await;

    core.refund(ORDER_ID, ActionRequest::amount(dec!(30.00), dec!(6.00)))
        .await
        .unwrap();

    let post = transport
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    let body = post.body.unwrap();
    assert_eq!(body["transaction"]["amount"], 3000);
    assert_eq!(body["transaction"]["vatAmount"], 600);
    assert_eq!(body["transaction"]["description"], "Refund for Order #42. Amount: 30.00");

    assert_eq!(platform.order(ORDER_ID).await.unwrap().status, OrderStatus::Captured);
    assert_eq!(platform.credited_total(ORDER_ID).await.unwrap().value(), 3000);
}

#[tokio::test]
async fn test_remote_rejection_is_formatted() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCaptureAmount", 10000)]),
        )
        .with_reply(
            Method::Post,
            &captures(),
            400,
            json!({
                "title": "Bad Request",
                "detail": "Input validation failed",
                "problems": [{ "name": "Transaction.Amount", "description": "Exceeds remaining amount" }]
            })
            .to_string(),
        );
    let (core, _) = setup(payment_order_order(), transport).await;

    let error = core
        .capture(ORDER_ID, ActionRequest::default())
        .await
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Input validation failed\nTransaction.Amount: Exceeds remaining amount"
    );
    assert_eq!(error.problems().len(), 1);
}

#[tokio::test]
async fn test_missing_reference() {
    let mut order = payment_order_order();
    order.payment_order_id = None;
    let (core, _) = setup(order, FixtureTransport::new()).await;

    let result = core.capture(ORDER_ID, ActionRequest::default()).await;
    assert!(matches!(result, Err(PaymentError::MissingReference(_))));
}

#[tokio::test]
async fn test_legacy_invoice_capture_uses_operation() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT,
            payment_resource(&[("remainingCaptureAmount", 10000)], "Invoice"),
        )
        .with_json(
            Method::Post,
            &format!("{PAYMENT}/captures"),
            json!({ "capture": { "transaction": transaction_json("Capture", 5, 10000, "Completed") } }),
        );
    let (core, _) = setup(legacy_order(), transport.clone()).await;

    // The remote keeps reporting a remaining amount, so the capture is noted only.
    core.capture(ORDER_ID, ActionRequest::default()).await.unwrap();

    let post = transport
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .unwrap();
    assert_eq!(post.path, format!("{PAYMENT}/captures"));
    let body = post.body.unwrap();
    assert_eq!(body["transaction"]["activity"], "FinancingConsumer");
    assert_eq!(body["transaction"]["itemDescriptions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_abort_cancels_order() {
    let mut aborted = payment_resource(&[], "CreditCard");
    aborted["payment"]["state"] = json!("Aborted");
    let transport = FixtureTransport::new()
        .with_json(Method::Get, PAYMENT, payment_resource(&[], "CreditCard"))
        .with_json(Method::Patch, PAYMENT, aborted);
    let (core, platform) = setup(legacy_order(), transport.clone()).await;

    core.abort(ORDER_ID).await.unwrap();

    assert_eq!(platform.order(ORDER_ID).await.unwrap().status, OrderStatus::Cancelled);
    let patch = transport
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Patch)
        .unwrap();
    assert_eq!(patch.body.unwrap()["payment"]["operation"], "Abort");
}

#[tokio::test]
async fn test_payee_info_defaults() {
    let (core, _) = setup(payment_order_order(), FixtureTransport::new()).await;

    let payee = core.payee_info(ORDER_ID).await.unwrap();
    assert_eq!(payee.payee_id.as_deref(), Some("payee-1"));
    assert_eq!(payee.payee_name.as_deref(), Some("Test shop"));
    assert_eq!(payee.order_reference.as_deref(), Some(ORDER_ID));
    assert!(payee.payee_reference.unwrap().starts_with("42x"));
    assert!(payee.subsite.is_none());
}

#[tokio::test]
async fn test_default_cancel_uses_order_totals() {
    // Shipping outside the items: 105.00 / 21.00 against items of 100.00 / 20.00.
    let mut order = payment_order_order();
    order.amount = MinorUnits::new(10500);
    order.vat_amount = MinorUnits::new(2100);

    let cancellations = format!("{PAYMENT_ORDER}/cancellations");
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCancellationAmount", 10500)]),
        )
        .with_json(Method::Get, PAYMENT_ORDER, payment_order_resource(&[]))
        .with_json(
            Method::Post,
            &cancellations,
            json!({ "cancellation": { "transaction": transaction_json("Cancellation", 7, 10500, "Completed") } }),
        );
    let (core, platform) = setup(order, transport.clone()).await;

    core.cancel(ORDER_ID, ActionRequest::default()).await.unwrap();

    assert_eq!(platform.order(ORDER_ID).await.unwrap().status, OrderStatus::Cancelled);
    assert_eq!(transport.count(Method::Post, &cancellations), 1);
}

#[tokio::test]
async fn test_default_capture_submits_order_totals() {
    let mut order = payment_order_order();
    order.amount = MinorUnits::new(10500);
    order.vat_amount = MinorUnits::new(2100);

    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCaptureAmount", 10500)]),
        )
        .with_json(Method::Get, PAYMENT_ORDER, payment_order_resource(&[]))
        .with_json(
            Method::Post,
            &captures(),
            json!({ "capture": { "transaction": transaction_json("Capture", 5, 10500, "Completed") } }),
        );
    let (core, _) = setup(order, transport.clone()).await;

    core.capture(ORDER_ID, ActionRequest::default()).await.unwrap();

    let body = transport
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .and_then(|r| r.body)
        .unwrap();
    assert_eq!(body["transaction"]["amount"], 10500);
    assert_eq!(body["transaction"]["vatAmount"], 2100);
    assert_eq!(body["transaction"]["orderItems"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_capture_of_items_submits_their_sum() {
    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCaptureAmount", 10000)]),
        )
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCaptureAmount", 4000)]),
        )
        .with_json(
            Method::Post,
            &captures(),
            json!({ "capture": { "transaction": transaction_json("Capture", 5, 6000, "Completed") } }),
        );
    let (core, platform) = setup(payment_order_order(), transport.clone()).await;

    core.capture(ORDER_ID, ActionRequest::items(vec![item("a", 6000, 1200)]))
        .await
        .unwrap();

    let body = transport
        .requests()
        .into_iter()
        .find(|r| r.method == Method::Post)
        .and_then(|r| r.body)
        .unwrap();
    assert_eq!(body["transaction"]["amount"], 6000);
    assert_eq!(body["transaction"]["vatAmount"], 1200);
    let items = body["transaction"]["orderItems"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["reference"], "a");

    assert_eq!(platform.order(ORDER_ID).await.unwrap().status, OrderStatus::Pending);
    assert_eq!(
        platform.notes(ORDER_ID).await,
        vec!["Payment has been partially captured: Transaction: 5. Amount: 60.00".to_string()]
    );
}

#[tokio::test]
async fn test_result_without_state_fails() {
    let mut stateless = transaction_json("Capture", 9, 10000, "Completed");
    stateless.as_object_mut().unwrap().remove("state");

    let transport = FixtureTransport::new()
        .with_json(
            Method::Get,
            PAYMENT_ORDER,
            payment_order_resource(&[("remainingCaptureAmount", 10000)]),
        )
        .with_json(Method::Post, &captures(), json!({ "capture": { "transaction": stateless } }));
    let (core, platform) = setup(payment_order_order(), transport).await;

    let result = core.capture(ORDER_ID, ActionRequest::default()).await;

    assert!(matches!(result, Err(PaymentError::OperationFailed(ref m)) if m == "Capture is failed."));
    assert_eq!(platform.order(ORDER_ID).await.unwrap().status, OrderStatus::Pending);
    assert!(platform.notes(ORDER_ID).await.is_empty());
}
