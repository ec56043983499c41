use std::sync::{Arc, atomic::Ordering};

use rust_decimal::Decimal;

use super::*;
use crate::{
    models::Job,
    services::{checkout::memory::MemoryStore, testing::FakeGateway},
};

fn settings() -> CheckoutSettings {
    CheckoutSettings {
        image_url: "http://localhost:8000/".to_string(),
        web_url: "http://localhost:3000/order-tracking/".to_string(),
        tax: TaxConfig::default(),
        password_cost: 4,
        refund_on_failure: false,
        job_max_attempts: 5,
    }
}

fn service(store: &MemoryStore, gateway: &Arc<FakeGateway>) -> CheckoutService {
    CheckoutService::new(Arc::new(store.clone()), gateway.clone(), settings())
}

fn request(payment_id: &str, total: i64, shipping: i64) -> CheckoutRequest {
    CheckoutRequest {
        username: "Asha".to_string(),
        phone: "9876543210".to_string(),
        email: Some("asha@example.com".to_string()),
        user_email: "asha@example.com".to_string(),
        user_fname: "Asha".to_string(),
        user_lname: "Rao".to_string(),
        user_address: "12 MG Road".to_string(),
        city: "Pune".to_string(),
        landmark: None,
        state: "Maharashtra".to_string(),
        pincode: "411001".to_string(),
        country: "India".to_string(),
        contact_mobile: "9876543210".to_string(),
        shipping_fee: Decimal::from(shipping),
        total_amount: Decimal::from(total),
        payment_id: payment_id.to_string(),
    }
}

#[tokio::test]
async fn places_a_single_order_for_the_whole_cart() {
    let store = MemoryStore::new();
    let frame = store.add_product("Frame", 1000).await;
    let certificate = store.add_product("Certificate", 500).await;
    store.add_cart_line("abc", frame.id, Some("Black")).await;
    store.add_cart_line("abc", certificate.id, None).await;
    store.add_cart_line("other", frame.id, None).await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 155000, Some("order_1")));

    let outcome = service(&store, &gateway)
        .checkout("abc", &request("pay_1", 1550, 50))
        .await
        .unwrap();

    assert!(!outcome.replayed);
    let state = store.snapshot().await;
    assert_eq!(state.orders.len(), 1);
    assert_eq!(state.orders[0].id, outcome.order_id);
    assert_eq!(state.lines.len(), 2);
    assert!(state.lines.iter().all(|l| l.order_id == outcome.order_id && l.quantity == 1));
    assert_eq!(state.payments.len(), 1);
    assert_eq!(state.statuses.len(), 1);
    assert_eq!(state.statuses[0].order_status, "Pending");
    assert_eq!(state.addresses.len(), 1);

    assert!(state.carts.iter().all(|c| c.session_id != "abc"));
    assert_eq!(state.carts.len(), 1, "other sessions keep their cart");

    let kinds: Vec<&str> = state.jobs.iter().map(|j| j.kind.as_str()).collect();
    assert_eq!(kinds, vec![Job::EMAIL_KIND, Job::INVOICE_KIND]);
    assert_eq!(
        state.locks,
        vec![
            "payment:pay_1",
            "cart:abc",
            "phone:9876543210",
            "email:asha@example.com"
        ]
    );
}

#[tokio::test]
async fn records_client_totals_and_gateway_payment() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    store.add_cart_line("abc", product.id, None).await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 105000, Some("order_1")));

    service(&store, &gateway)
        .checkout("abc", &request("pay_1", 1050, 50))
        .await
        .unwrap();

    let state = store.snapshot().await;
    let order = &state.orders[0];
    assert_eq!(order.txn_id, "order_1");
    assert_eq!(order.payment_ref, "pay_1");
    assert_eq!(order.total_amount, Decimal::from(1050));
    assert_eq!(order.paid_amount, Decimal::from(1050));
    assert_eq!(order.shipping_fee, Decimal::from(50));
    assert_eq!(order.sub_total, Decimal::from(1050));

    let payment = &state.payments[0];
    assert_eq!(payment.payment_id, "pay_1");
    assert_eq!(payment.payment_amount, 105000);
    assert_eq!(payment.payment_status, "captured");
    assert_eq!(payment.payment_response["order_id"], "order_1");
}

#[tokio::test]
async fn empty_cart_persists_nothing() {
    let store = MemoryStore::new();
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 1000, Some("order_1")));

    let err = service(&store, &gateway)
        .checkout("abc", &request("pay_1", 10, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::EmptyCart(ref s) if s == "abc"));
    let state = store.snapshot().await;
    assert!(state.orders.is_empty());
    assert!(state.payments.is_empty());
    assert!(state.addresses.is_empty());
    assert!(state.users.is_empty());
    assert!(state.jobs.is_empty());
    assert!(gateway.refunds.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_checkout_refunds_when_enabled() {
    let store = MemoryStore::new();
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 1000, Some("order_1")));
    let mut settings = settings();
    settings.refund_on_failure = true;
    let service = CheckoutService::new(Arc::new(store.clone()), gateway.clone(), settings);

    let result = service.checkout("abc", &request("pay_1", 10, 0)).await;

    assert!(result.is_err());
    assert_eq!(
        *gateway.refunds.lock().unwrap(),
        vec![("pay_1".to_string(), 1000)]
    );
}

#[tokio::test]
async fn unknown_payment_is_rejected_before_any_write() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    store.add_cart_line("abc", product.id, None).await;
    let gateway = Arc::new(FakeGateway::default());

    let err = service(&store, &gateway)
        .checkout("abc", &request("pay_missing", 1000, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PaymentNotFound(_)));
    let state = store.snapshot().await;
    assert!(state.orders.is_empty());
    assert_eq!(state.carts.len(), 1);
}

#[tokio::test]
async fn refunded_payment_places_no_order() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    store.add_cart_line("abc", product.id, None).await;
    let gateway = Arc::new(FakeGateway::default());
    gateway.add_payment_with_status("pay_1", 100000, Some("order_1"), "refunded");

    let err = service(&store, &gateway)
        .checkout("abc", &request("pay_1", 1000, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("refunded")));
    let state = store.snapshot().await;
    assert!(state.orders.is_empty());
    assert!(state.payments.is_empty());
    assert!(state.jobs.is_empty());
    assert_eq!(state.carts.len(), 1);
    assert!(gateway.refunds.lock().unwrap().is_empty());
}

#[tokio::test]
async fn same_payment_twice_returns_the_first_order() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    store.add_cart_line("abc", product.id, None).await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 100000, Some("order_1")));
    let service = service(&store, &gateway);

    let first = service.checkout("abc", &request("pay_1", 1000, 0)).await.unwrap();
    let second = service.checkout("abc", &request("pay_1", 1000, 0)).await.unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(first.order_id, second.order_id);
    assert_eq!(gateway.fetches.load(Ordering::SeqCst), 1);

    let state = store.snapshot().await;
    assert_eq!(state.orders.len(), 1);
    assert_eq!(state.payments.len(), 1);
    assert_eq!(state.jobs.len(), 2);
}

#[tokio::test]
async fn transaction_guard_blocks_duplicates_without_the_pre_check() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    store.add_cart_line("abc", product.id, None).await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 100000, Some("order_1")));
    let service = service(&store, &gateway);

    let first = service.place_order("abc", &request("pay_1", 1000, 0)).await.unwrap();
    // The cart is refilled, so only the payment reference can stop a second order.
    store.add_cart_line("abc", product.id, None).await;
    let second = service.place_order("abc", &request("pay_1", 1000, 0)).await.unwrap();

    assert!(second.replayed);
    assert_eq!(first.order_id, second.order_id);
    assert_eq!(gateway.fetches.load(Ordering::SeqCst), 2);

    let state = store.snapshot().await;
    assert_eq!(state.orders.len(), 1);
    assert_eq!(state.carts.len(), 1, "refilled cart is left alone");
}

#[tokio::test]
async fn tag_selections_move_to_the_order_line() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    let line = store.add_cart_line("abc", product.id, None).await;
    store.add_tag(&line, "Name", "Dr. Asha Rao").await;
    store.add_tag(&line, "Year", "2025").await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 100000, Some("order_1")));

    let outcome = service(&store, &gateway)
        .checkout("abc", &request("pay_1", 1000, 0))
        .await
        .unwrap();

    let state = store.snapshot().await;
    let order_line = &state.lines[0];
    assert_eq!(state.tags.len(), 2);
    for tag in &state.tags {
        assert_eq!(tag.cart_line_id, None);
        assert_eq!(tag.order_line_id, Some(order_line.id));
    }

    let summary = outcome.summary.unwrap();
    assert_eq!(summary.products[0].tags.len(), 2);
    assert_eq!(summary.products[0].tags[0].data, "Dr. Asha Rao");
}

#[tokio::test]
async fn buyer_is_matched_by_phone_then_email() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    let by_email = store
        .add_user("existing", None, Some("asha@example.com"))
        .await;
    store.add_cart_line("abc", product.id, None).await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 100000, Some("order_1")));

    service(&store, &gateway)
        .checkout("abc", &request("pay_1", 1000, 0))
        .await
        .unwrap();

    let state = store.snapshot().await;
    assert_eq!(state.users.len(), 1);
    assert_eq!(state.orders[0].user_id, by_email.id);

    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    let by_phone = store.add_user("phone", Some("9876543210"), None).await;
    store.add_user("mail", None, Some("asha@example.com")).await;
    store.add_cart_line("abc", product.id, None).await;

    service(&store, &gateway)
        .checkout("abc", &request("pay_1", 1000, 0))
        .await
        .unwrap();

    let state = store.snapshot().await;
    assert_eq!(state.orders[0].user_id, by_phone.id);
}

#[tokio::test]
async fn sessions_sharing_a_new_phone_share_one_account() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    store.add_cart_line("abc", product.id, None).await;
    store.add_cart_line("xyz", product.id, None).await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 100000, Some("order_1")));
    gateway.add_payment("pay_2", 100000, Some("order_2"));
    let checkout = service(&store, &gateway);

    let first = request("pay_1", 1000, 0);
    let second = request("pay_2", 1000, 0);
    let (a, b) = tokio::join!(
        checkout.checkout("abc", &first),
        checkout.checkout("xyz", &second)
    );
    a.unwrap();
    b.unwrap();

    let state = store.snapshot().await;
    assert_eq!(state.users.len(), 1);
    assert_eq!(state.orders.len(), 2);
    assert!(state.orders.iter().all(|o| o.user_id == state.users[0].id));
    let phone_locks = state
        .locks
        .iter()
        .filter(|key| *key == "phone:9876543210")
        .count();
    assert_eq!(phone_locks, 2);
}

#[tokio::test]
async fn new_buyer_gets_a_hashed_phone_password() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    store.add_cart_line("abc", product.id, None).await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 100000, Some("order_1")));

    service(&store, &gateway)
        .checkout("abc", &request("pay_1", 1000, 0))
        .await
        .unwrap();

    let state = store.snapshot().await;
    let user = &state.users[0];
    assert_eq!(user.phone.as_deref(), Some("9876543210"));
    let hash = user.password.as_deref().unwrap();
    assert_ne!(hash, "9876543210");
    assert!(bcrypt::verify("9876543210", hash).unwrap());
}

#[tokio::test]
async fn txn_id_falls_back_to_payment_id() {
    let store = MemoryStore::new();
    let product = store.add_product("Frame", 1000).await;
    store.add_cart_line("abc", product.id, None).await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_1", 100000, None));

    service(&store, &gateway)
        .checkout("abc", &request("pay_1", 1000, 0))
        .await
        .unwrap();

    let state = store.snapshot().await;
    assert_eq!(state.orders[0].txn_id, "pay_1");
}

#[tokio::test]
async fn frame_order_end_to_end() {
    let store = MemoryStore::new();
    let product = store.add_product("P", 1000).await;
    store.add_cart_line("abc", product.id, Some("Black")).await;
    let gateway = Arc::new(FakeGateway::with_payment("pay_e2e", 110000, Some("order_e2e")));

    let outcome = service(&store, &gateway)
        .checkout("abc", &request("pay_e2e", 1100, 100))
        .await
        .unwrap();

    let state = store.snapshot().await;
    let line = &state.lines[0];
    assert_eq!(line.frame_color, "Black");
    assert_eq!(line.certificate_color, "");
    assert_eq!(line.amount, Decimal::from(1000));
    assert_eq!(state.payments[0].payment_status, "captured");
    assert!(state.carts.is_empty());
    assert_eq!(state.addresses[0].city, "Pune");

    let summary = outcome.summary.unwrap();
    assert_eq!(summary.amount, Decimal::from(1000));
    assert_eq!(summary.shipping_address.full_name, "Asha Rao");
    assert_eq!(
        summary.products[0].thumbnail_url,
        "http://localhost:8000/products/p.png"
    );
    assert_eq!(
        summary.tracking_url,
        "http://localhost:3000/order-tracking/order_e2e"
    );

    let queued = Job::from_parts(&state.jobs[1].kind, state.jobs[1].payload.clone()).unwrap();
    assert_eq!(queued, Job::InvoicePdf { summary });
}
