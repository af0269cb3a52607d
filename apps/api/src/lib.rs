//! # Folio API
//!
//! HTTP order service for the Folio storefront.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Folio API                                       │
//! │                                                                         │
//! │  ┌──────────────┐   ┌────────────────┐   ┌──────────────────────────┐  │
//! │  │   routes     │   │   services     │   │   folio-db               │  │
//! │  │              │──►│                │──►│                          │  │
//! │  │ • /orders    │   │ • checkout     │   │ • pricing policy         │  │
//! │  │ • /admin/... │   │ • lifecycle    │   │ • stock ledger           │  │
//! │  │ • /health    │   │                │   │ • orders, notifications  │  │
//! │  └──────┬───────┘   └───────┬────────┘   └──────────────────────────┘  │
//! │         │                   │ dispatch (try_send)                      │
//! │  ┌──────▼───────┐   ┌───────▼────────┐                                 │
//! │  │ auth (JWT)   │   │ fulfillment    │  Notifier + Mailer, own task    │
//! │  └──────────────┘   └────────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::Router;
use tower_http::trace::TraceLayer;

use folio_db::Database;

pub mod auth;
pub mod config;
pub mod error;
pub mod fulfillment;
pub mod routes;
pub mod services;

pub use auth::{JwtManager, Role};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use fulfillment::{FulfillmentHandle, FulfillmentNotifier, FulfillmentWorker};

use crate::services::{CheckoutService, LifecycleService};

/// Shared application state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub notifier: FulfillmentNotifier,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager, notifier: FulfillmentNotifier) -> Self {
        AppState { db, jwt, notifier }
    }

    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(self.db.clone(), self.notifier.clone())
    }

    pub fn lifecycle(&self) -> LifecycleService {
        LifecycleService::new(self.db.clone(), self.notifier.clone())
    }
}

/// Builds the complete router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
