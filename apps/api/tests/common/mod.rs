//! Test harness: an in-memory database, the full router, and a running
//! fulfillment worker.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tower::ServiceExt;
use uuid::Uuid;

use folio_api::fulfillment::{LogMailer, Mailer, Notifier, StoredNotifier};
use folio_api::{app, AppState, FulfillmentHandle, FulfillmentWorker, JwtManager, Role};
use folio_core::{
    Item, Money, PaymentMethodToggles, PricingPolicy, PricingSettings, TaxRate,
};
use folio_db::{Database, DbConfig};

pub const SECRET: &str = "integration-test-secret";
pub const ADMIN: &str = "admin-1";

pub struct TestApp {
    pub db: Database,
    pub state: AppState,
    pub router: Router,
    pub jwt: JwtManager,
    handle: FulfillmentHandle,
    worker: Option<JoinHandle<()>>,
}

impl TestApp {
    /// App with the standard pricing policy.
    pub async fn new() -> Self {
        let app = Self::without_policy().await;
        app.db.pricing().save(&policy()).await.unwrap();
        app
    }

    /// App with no pricing policy row.
    pub async fn without_policy() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let notifier = Arc::new(StoredNotifier::new(db.notifications()));
        Self::build(db, notifier, Arc::new(LogMailer)).await
    }

    /// App with the standard policy and custom fulfillment collaborators.
    pub async fn with_collaborators(notifier: Arc<dyn Notifier>, mailer: Arc<dyn Mailer>) -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.pricing().save(&policy()).await.unwrap();
        Self::build(db, notifier, mailer).await
    }

    async fn build(db: Database, notifier: Arc<dyn Notifier>, mailer: Arc<dyn Mailer>) -> Self {
        let (worker, sender, handle) = FulfillmentWorker::new(64, notifier, mailer, ADMIN);
        let worker = tokio::spawn(worker.run());
        let jwt = JwtManager::new(SECRET, 3600);
        let state = AppState::new(db.clone(), jwt.clone(), sender);
        let router = app(state.clone());

        TestApp {
            db,
            state,
            router,
            jwt,
            handle,
            worker: Some(worker),
        }
    }

    pub async fn add_item(&self, sku: &str, price_cents: i64, stock: i64) -> Item {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            title: format!("Title {}", sku),
            price_cents,
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.db.items().insert(&item).await.unwrap();
        item
    }

    pub async fn stock_of(&self, item_id: &str) -> i64 {
        self.db.items().stock_of(item_id).await.unwrap().unwrap()
    }

    pub fn buyer_token(&self, buyer_id: &str) -> String {
        self.jwt.issue(buyer_id, Role::Buyer).unwrap()
    }

    pub fn admin_token(&self) -> String {
        self.jwt.issue(ADMIN, Role::Admin).unwrap()
    }

    /// Sends one request. Non-JSON bodies come back as a JSON string.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn checkout(&self, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, "/orders", Some(token), Some(body)).await
    }

    pub async fn admin_post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let token = self.admin_token();
        self.send(Method::POST, uri, Some(&token), Some(body)).await
    }

    /// Stops the worker after it has handled everything queued so far.
    pub async fn drain(&mut self) {
        self.handle.shutdown().await;
        if let Some(worker) = self.worker.take() {
            worker.await.unwrap();
        }
    }
}

/// 6% tax, 15.00 shipping, free shipping from 100.00, US/CA only,
/// cash on delivery and card enabled.
pub fn policy() -> PricingPolicy {
    PricingPolicy::new(
        PricingSettings {
            tax_rate: TaxRate::from_bps(600),
            currency: "USD".to_string(),
            shipping_fee: Money::from_cents(1500),
            free_shipping_threshold: Some(Money::from_cents(10_000)),
            estimated_delivery_days: 5,
            allowed_countries: vec!["US".to_string(), "CA".to_string()],
            payment_methods: PaymentMethodToggles::default(),
        },
        Utc::now(),
    )
    .unwrap()
}

pub fn address() -> Value {
    json!({
        "fullName": "Ada Reader",
        "line1": "1 Library Way",
        "city": "Springfield",
        "region": "IL",
        "postalCode": "62701",
        "country": "US"
    })
}

/// A checkout body with `(item_id, quantity)` lines.
pub fn cart(lines: &[(&str, i64)], method: &str) -> Value {
    let items: Vec<Value> = lines
        .iter()
        .map(|(item_id, quantity)| json!({ "itemId": item_id, "quantity": quantity }))
        .collect();
    json!({
        "items": items,
        "shippingAddress": address(),
        "method": method
    })
}
