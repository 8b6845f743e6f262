#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use booking_service::config::StripeSettings;
use booking_service::models::Booking;
use booking_service::services::{BookingStore, StripeClient};
use booking_service::{build_router, AppState, Application};
use secrecy::Secret;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_SECRET_KEY: &str = "sk_test_123";
pub const TEST_CURRENCY: &str = "bgn";

/// Booking store kept in memory. Mirrors the unique index on
/// `payment_intent_id` the Mongo repository creates.
#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<Vec<Booking>>,
    fail_writes: bool,
}

impl InMemoryBookingStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert_booking(&self, booking: Booking) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("connection refused");
        }
        let mut bookings = self.bookings.lock().unwrap();
        if bookings
            .iter()
            .any(|b| b.payment_intent_id == booking.payment_intent_id)
        {
            anyhow::bail!("duplicate key: payment_intent_id");
        }
        bookings.push(booking);
        Ok(())
    }

    async fn get_booking(&self, id: &str) -> anyhow::Result<Option<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> anyhow::Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub fn stripe_settings(base_uri: &str) -> StripeSettings {
    StripeSettings {
        secret_key: Secret::new(TEST_SECRET_KEY.to_string()),
        api_base_url: format!("{}/v1", base_uri),
        api_version: "2025-03-31.basil".to_string(),
        currency: TEST_CURRENCY.to_string(),
    }
}

pub fn test_state(stripe: &MockServer, store: Arc<InMemoryBookingStore>) -> AppState {
    AppState::new(
        Arc::new(StripeClient::new(stripe_settings(&stripe.uri()))),
        store,
        TEST_CURRENCY,
    )
}

/// Router for in-process `oneshot` tests.
pub fn test_router(stripe: &MockServer, store: Arc<InMemoryBookingStore>) -> Router {
    build_router(test_state(stripe, store))
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub stripe: MockServer,
    pub store: Arc<InMemoryBookingStore>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_store(InMemoryBookingStore::default()).await
    }

    pub async fn spawn_with_store(store: InMemoryBookingStore) -> Self {
        let stripe = MockServer::start().await;
        let store = Arc::new(store);

        let app = Application::with_state("127.0.0.1", 0, test_state(&stripe, store.clone()))
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            stripe,
            store,
        }
    }
}

pub fn intent_json(id: &str, amount: i64, customer: &str, secret: &str, status: &str) -> Value {
    json!({
        "id": id,
        "object": "payment_intent",
        "amount": amount,
        "currency": TEST_CURRENCY,
        "customer": customer,
        "client_secret": secret,
        "status": status
    })
}

/// `GET /v1/customers?email=...` answering with the given customers.
pub async fn mount_customer_lookup(stripe: &MockServer, customers: Value) {
    Mock::given(method("GET"))
        .and(path("/v1/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": customers,
            "has_more": false
        })))
        .mount(stripe)
        .await;
}

pub async fn mount_customer_create(stripe: &MockServer, id: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "object": "customer",
            "email": "a@x.com",
            "name": "A"
        })))
        .expect(expected_calls)
        .mount(stripe)
        .await;
}

pub async fn mount_ephemeral_key(stripe: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/ephemeral_keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ephkey_1",
            "object": "ephemeral_key",
            "secret": "ek_test_1",
            "created": 1_700_000_000,
            "expires": 1_700_003_600
        })))
        .mount(stripe)
        .await;
}

pub async fn mount_intent_create(stripe: &MockServer, intent: Value) {
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent))
        .mount(stripe)
        .await;
}

/// `GET /v1/payment_intents/{id}`. With `times`, the mock answers that many
/// requests and then yields to lower-priority mocks.
pub async fn mount_intent_retrieve(stripe: &MockServer, intent: Value, times: Option<u64>) {
    let id = intent["id"].as_str().unwrap_or_default().to_string();
    let mock = Mock::given(method("GET"))
        .and(path(format!("/v1/payment_intents/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent));

    match times {
        Some(n) => mock.up_to_n_times(n).with_priority(1).mount(stripe).await,
        None => mock.mount(stripe).await,
    }
}

pub async fn mount_intent_confirm(stripe: &MockServer, intent: Value, expected_calls: u64) {
    let id = intent["id"].as_str().unwrap_or_default().to_string();
    Mock::given(method("POST"))
        .and(path(format!("/v1/payment_intents/{}/confirm", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent))
        .expect(expected_calls)
        .mount(stripe)
        .await;
}

/// Every Stripe call the full checkout makes, for a new customer `cus_1`
/// paying `amount_minor` with intent `pi_1` and secret `secret`.
pub async fn mount_full_checkout(stripe: &MockServer, amount_minor: i64, secret: &str) {
    mount_customer_lookup(stripe, json!([])).await;
    mount_customer_create(stripe, "cus_1", 1).await;
    mount_ephemeral_key(stripe).await;
    mount_intent_create(
        stripe,
        intent_json("pi_1", amount_minor, "cus_1", secret, "requires_payment_method"),
    )
    .await;
    mount_intent_retrieve(
        stripe,
        intent_json("pi_1", amount_minor, "cus_1", secret, "requires_payment_method"),
        Some(1),
    )
    .await;
    mount_intent_retrieve(
        stripe,
        intent_json("pi_1", amount_minor, "cus_1", secret, "succeeded"),
        None,
    )
    .await;
    mount_intent_confirm(
        stripe,
        intent_json("pi_1", amount_minor, "cus_1", secret, "succeeded"),
        1,
    )
    .await;
}
