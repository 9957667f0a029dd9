use actix_web::{http::StatusCode, web::ServiceConfig};
use farmgate_engine::{
    db_types::{OrderStatus, PaymentStatus, TransactionStatus},
    test_utils::{Marketplace, SeededOrder},
    PaymentInitialization,
    SettlementReport,
    SqliteDatabase,
};
use fg_common::{Kobo, Provider};
use gateway_tools::{GatewayError, InitializeResponse};
use serde_json::json;

use super::{
    helpers::{
        configure_app_data,
        get_request,
        new_market,
        paystack_signature,
        post_request,
        settlement_api,
        tear_down,
        FLUTTERWAVE_HASH,
    },
    mocks::{paid, pending, MockGateway},
};
use crate::{
    data_objects::{JsonResponse, PaymentStatusResponse},
    middleware::{FLUTTERWAVE_HASH_HEADER, PAYSTACK_SIGNATURE_HEADER},
    routes::{
        InitializePaymentRoute,
        OrderCommissionsRoute,
        PaymentWebhookRoute,
        PollPaymentRoute,
        ReconcilePaymentRoute,
    },
};

fn payment_routes(market: &Marketplace, gateway: MockGateway, test_mode: bool) -> impl FnOnce(&mut ServiceConfig) {
    let api = settlement_api(market, gateway, test_mode);
    move |cfg: &mut ServiceConfig| {
        configure_app_data(cfg, api);
        cfg.service(PaymentWebhookRoute::<SqliteDatabase, MockGateway>::new())
            .service(PollPaymentRoute::<SqliteDatabase, MockGateway>::new())
            .service(InitializePaymentRoute::<SqliteDatabase, MockGateway>::new())
            .service(ReconcilePaymentRoute::<SqliteDatabase, MockGateway>::new())
            .service(OrderCommissionsRoute::<SqliteDatabase, MockGateway>::new());
    }
}

fn paystack_charge(reference: &str, amount: Kobo) -> String {
    json!({
        "event": "charge.success",
        "data": { "reference": reference, "amount": amount.value(), "status": "success", "currency": "NGN" }
    })
    .to_string()
}

async fn market_with_order(quantity: i64, price: Kobo) -> (Marketplace, SeededOrder) {
    let mut market = new_market().await;
    let farmer = market.add_farmer().await;
    let partner = market.add_partner(None).await;
    market.assign_partner(&farmer, &partner).await;
    let listing = market.add_listing(&farmer, 20, price).await;
    let order = market.place_order(&[(&listing, quantity)]).await;
    (market, order)
}

#[actix_web::test]
async fn signed_paystack_webhook_settles_the_order() {
    let (market, order) = market_with_order(2, Kobo::from(50_000)).await;
    let total = order.order.total;
    let mut gateway = MockGateway::new();
    gateway
        .expect_verify()
        .withf(|provider, _| *provider == Provider::Paystack)
        .times(1)
        .returning(move |p, r| Ok(paid(p, r, total)));
    let body = paystack_charge(order.reference(), total);
    let signature = paystack_signature(&body);
    let (status, res) = post_request(
        "/payments/verify",
        &body,
        &[(PAYSTACK_SIGNATURE_HEADER, &signature)],
        payment_routes(&market, gateway, false),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let res: PaymentStatusResponse = serde_json::from_str(&res).unwrap();
    assert_eq!(res.outcome, "settled");
    assert_eq!(res.transaction.status, TransactionStatus::Completed);
    let order = market.order(order.order.id).await;
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    tear_down(market).await;
}

#[actix_web::test]
async fn repeated_webhooks_settle_once() {
    let (market, order) = market_with_order(1, Kobo::from(10_000)).await;
    let total = order.order.total;
    let body = paystack_charge(order.reference(), total);
    let signature = paystack_signature(&body);
    let mut outcomes = Vec::new();
    for _ in 0..3 {
        let mut gateway = MockGateway::new();
        gateway.expect_verify().returning(move |p, r| Ok(paid(p, r, total)));
        let (status, res) = post_request(
            "/payments/verify",
            &body,
            &[(PAYSTACK_SIGNATURE_HEADER, &signature)],
            payment_routes(&market, gateway, false),
        )
        .await
        .expect("Request failed");
        assert_eq!(status, StatusCode::OK);
        outcomes.push(serde_json::from_str::<PaymentStatusResponse>(&res).unwrap().outcome);
    }
    assert_eq!(outcomes, vec!["settled", "already_settled", "already_settled"]);
    let (status, res) = get_request(
        &format!("/orders/{}/commissions", order.order.id),
        payment_routes(&market, MockGateway::new(), false),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let commissions: Vec<serde_json::Value> = serde_json::from_str(&res).unwrap();
    assert_eq!(commissions.len(), 1);
    // 5% of ₦100.00
    assert_eq!(commissions[0]["amount"], 500);
    tear_down(market).await;
}

#[actix_web::test]
async fn webhook_with_bad_signature_is_rejected() {
    let (market, order) = market_with_order(1, Kobo::from(10_000)).await;
    let mut gateway = MockGateway::new();
    gateway.expect_verify().times(0);
    let body = paystack_charge(order.reference(), order.order.total);
    let forged = paystack_signature("{}");
    let err = post_request(
        "/payments/verify",
        &body,
        &[(PAYSTACK_SIGNATURE_HEADER, &forged)],
        payment_routes(&market, gateway, false),
    )
    .await
    .expect_err("Forged signature should be rejected");
    assert_eq!(err, "Invalid webhook signature.");
    assert_eq!(market.transaction(order.reference()).await.status, TransactionStatus::Pending);
    tear_down(market).await;
}

#[actix_web::test]
async fn webhook_without_signature_is_rejected() {
    let (market, order) = market_with_order(1, Kobo::from(10_000)).await;
    let body = paystack_charge(order.reference(), order.order.total);
    let err = post_request("/payments/verify", &body, &[], payment_routes(&market, MockGateway::new(), false))
        .await
        .expect_err("Unsigned webhook should be rejected");
    assert_eq!(err, "No webhook signature found.");
    tear_down(market).await;
}

#[actix_web::test]
async fn flutterwave_webhook_for_unknown_reference_is_recorded() {
    let market = new_market().await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_verify()
        .withf(|provider, _| *provider == Provider::Flutterwave)
        .times(1)
        .returning(|p, r| {
            assert_eq!(r, "FLW-offline-7781");
            Ok(paid(p, r, Kobo::from(750_000)))
        });
    let body = json!({
        "event": "charge.completed",
        "data": { "id": 285959875, "tx_ref": "FLW-offline-7781", "amount": 7500, "status": "successful" }
    })
    .to_string();
    let (status, res) = post_request(
        "/payments/verify",
        &body,
        &[(FLUTTERWAVE_HASH_HEADER, FLUTTERWAVE_HASH)],
        payment_routes(&market, gateway, false),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let res: PaymentStatusResponse = serde_json::from_str(&res).unwrap();
    assert_eq!(res.outcome, "settled");
    assert_eq!(res.transaction.provider, Provider::Flutterwave);
    assert_eq!(res.transaction.amount, Kobo::from(750_000));
    assert!(res.transaction.order_id.is_none());
    assert!(res.order.is_none());
    tear_down(market).await;
}

#[actix_web::test]
async fn wrong_flutterwave_hash_is_rejected() {
    let market = new_market().await;
    let body = json!({"event": "charge.completed", "data": {"tx_ref": "FLW-1"}}).to_string();
    let err = post_request(
        "/payments/verify",
        &body,
        &[(FLUTTERWAVE_HASH_HEADER, "not-the-hash")],
        payment_routes(&market, MockGateway::new(), false),
    )
    .await
    .expect_err("Wrong hash should be rejected");
    assert_eq!(err, "Invalid webhook signature.");
    tear_down(market).await;
}

#[actix_web::test]
async fn other_events_are_acknowledged_and_ignored() {
    let market = new_market().await;
    let mut gateway = MockGateway::new();
    gateway.expect_verify().times(0);
    let body = json!({"event": "transfer.success", "data": {"reference": "TRF-1"}}).to_string();
    let signature = paystack_signature(&body);
    let (status, res) = post_request(
        "/payments/verify",
        &body,
        &[(PAYSTACK_SIGNATURE_HEADER, &signature)],
        payment_routes(&market, gateway, false),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let res: JsonResponse = serde_json::from_str(&res).unwrap();
    assert!(res.success);
    assert_eq!(res.message, "Event 'transfer.success' ignored");
    tear_down(market).await;
}

#[actix_web::test]
async fn webhook_during_provider_outage_asks_for_a_retry() {
    let (market, order) = market_with_order(1, Kobo::from(10_000)).await;
    let mut gateway = MockGateway::new();
    gateway.expect_verify().returning(|_, _| Err(GatewayError::Transport("connection reset".into())));
    let body = paystack_charge(order.reference(), order.order.total);
    let signature = paystack_signature(&body);
    let (status, _) = post_request(
        "/payments/verify",
        &body,
        &[(PAYSTACK_SIGNATURE_HEADER, &signature)],
        payment_routes(&market, gateway, false),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(market.transaction(order.reference()).await.status, TransactionStatus::Pending);
    tear_down(market).await;
}

#[actix_web::test]
async fn poll_reports_a_pending_charge() {
    let (market, order) = market_with_order(1, Kobo::from(10_000)).await;
    let mut gateway = MockGateway::new();
    gateway.expect_verify().times(1).returning(|p, r| Ok(pending(p, r)));
    let path = format!("/payments/verify/{}?paymentProvider=paystack", order.reference());
    let (status, res) = get_request(&path, payment_routes(&market, gateway, false)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let res: PaymentStatusResponse = serde_json::from_str(&res).unwrap();
    assert_eq!(res.outcome, "not_yet_paid");
    assert_eq!(res.transaction.status, TransactionStatus::Pending);
    assert_eq!(res.order.map(|o| o.payment_status), Some(PaymentStatus::Pending));
    tear_down(market).await;
}

#[actix_web::test]
async fn poll_during_provider_outage_says_retry_later() {
    let (market, order) = market_with_order(1, Kobo::from(10_000)).await;
    let mut gateway = MockGateway::new();
    gateway.expect_verify().returning(|_, _| Err(GatewayError::Timeout(10)));
    let path = format!("/payments/verify/{}", order.reference());
    let (status, res) = get_request(&path, payment_routes(&market, gateway, false)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let res: PaymentStatusResponse = serde_json::from_str(&res).unwrap();
    assert_eq!(res.outcome, "retry_later");
    assert_eq!(res.transaction.status, TransactionStatus::Pending);
    assert!(res.message.unwrap().contains("did not respond within 10 seconds"));
    tear_down(market).await;
}

#[actix_web::test]
async fn poll_for_unknown_or_malformed_references() {
    let market = new_market().await;
    let mut gateway = MockGateway::new();
    gateway.expect_verify().times(0);
    let routes = payment_routes(&market, gateway, false);
    let (status, res) = get_request("/payments/verify/FG-404-0000000000000000", routes).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(res.contains("No transaction exists with reference FG-404-0000000000000000"));
    let routes = payment_routes(&market, MockGateway::new(), false);
    let (status, _) = get_request("/payments/verify/bad%20reference", routes).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    tear_down(market).await;
}

#[actix_web::test]
async fn initialize_returns_the_checkout_url() {
    let (market, order) = market_with_order(3, Kobo::from(2_500)).await;
    let mut gateway = MockGateway::new();
    gateway.expect_initialize().times(1).returning(|provider, req| {
        Ok(InitializeResponse {
            provider,
            reference: req.reference.clone(),
            authorization_url: format!("https://checkout.paystack.com/{}", req.reference),
            access_code: Some("acc_123".to_string()),
        })
    });
    let body = json!({"order_id": order.order.id, "email": "buyer@farmgate.ng"}).to_string();
    let (status, res) = post_request("/payments/initialize", &body, &[], payment_routes(&market, gateway, false))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let init: PaymentInitialization = serde_json::from_str(&res).unwrap();
    assert_eq!(init.transaction.status, TransactionStatus::Pending);
    assert_eq!(init.transaction.amount, Kobo::from(7_500));
    assert_eq!(
        init.authorization_url,
        Some(format!("https://checkout.paystack.com/{}", init.transaction.reference))
    );
    assert!(init.settlement.is_none());
    tear_down(market).await;
}

#[actix_web::test]
async fn initialize_in_test_mode_settles_immediately() {
    let (market, order) = market_with_order(3, Kobo::from(2_500)).await;
    let mut gateway = MockGateway::new();
    gateway.expect_initialize().times(0);
    gateway.expect_verify().times(0);
    let body = json!({"order_id": order.order.id, "provider": "flutterwave", "email": "buyer@farmgate.ng"}).to_string();
    let (status, res) = post_request("/payments/initialize", &body, &[], payment_routes(&market, gateway, true))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let init: PaymentInitialization = serde_json::from_str(&res).unwrap();
    assert_eq!(init.transaction.status, TransactionStatus::Completed);
    assert_eq!(init.settlement.map(|s| s.outcome()), Some("settled"));
    assert_eq!(market.order(order.order.id).await.payment_status, PaymentStatus::Paid);

    let body = json!({"order_id": order.order.id, "email": "buyer@farmgate.ng"}).to_string();
    let (status, _) = post_request("/payments/initialize", &body, &[], payment_routes(&market, MockGateway::new(), true))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    tear_down(market).await;
}

#[actix_web::test]
async fn initialize_rejects_unknown_orders_and_currencies() {
    let (market, order) = market_with_order(1, Kobo::from(2_500)).await;
    let body = json!({"order_id": 987_654, "email": "buyer@farmgate.ng"}).to_string();
    let (status, _) = post_request("/payments/initialize", &body, &[], payment_routes(&market, MockGateway::new(), false))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = json!({"order_id": order.order.id, "email": "buyer@farmgate.ng", "currency": "USD"}).to_string();
    let (status, res) = post_request("/payments/initialize", &body, &[], payment_routes(&market, MockGateway::new(), false))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(res.contains("Payments in USD are not supported yet"));
    tear_down(market).await;
}

#[actix_web::test]
async fn reconcile_repairs_only_completed_payments() {
    let (market, order) = market_with_order(2, Kobo::from(4_000)).await;
    let (status, _) = post_request(
        &format!("/payments/reconcile/{}", order.reference()),
        "",
        &[],
        payment_routes(&market, MockGateway::new(), false),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);

    let mut gateway = MockGateway::new();
    let total = order.order.total;
    gateway.expect_verify().returning(move |p, r| Ok(paid(p, r, total)));
    let path = format!("/payments/verify/{}", order.reference());
    let (status, _) = get_request(&path, payment_routes(&market, gateway, false)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);

    let (status, res) = post_request(
        &format!("/payments/reconcile/{}", order.reference()),
        "",
        &[],
        payment_routes(&market, MockGateway::new(), false),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let report: SettlementReport = serde_json::from_str(&res).unwrap();
    assert_eq!(report.recorded_commissions(), 0);
    assert!(report.shortfalls.is_empty());
    // Stock was taken once, by the poll, not again by the reconciliation
    assert_eq!(market.listing(order.items[0].listing_id).await.available_quantity, 18);
    tear_down(market).await;
}

#[actix_web::test]
async fn commissions_for_unknown_order_is_not_found() {
    let market = new_market().await;
    let (status, _) = get_request("/orders/424242/commissions", payment_routes(&market, MockGateway::new(), false))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    tear_down(market).await;
}
