//! # HTTP Routes
//!
//! ```text
//! GET  /health                          anyone
//!
//! POST /orders                          buyer   (require_auth)
//! GET  /orders?status=
//! GET  /orders/{id}
//! POST /orders/{id}/cancel
//!
//! POST /admin/orders/{id}/pay           admin   (require_admin)
//! POST /admin/orders/{id}/shipping
//! POST /admin/orders/{id}/refund
//! POST /admin/orders/{id}/cancel
//! ```
//!
//! Bodies are camelCase JSON; money is integer minor units. The cancel
//! routes also accept an empty body.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;

use folio_core::Order;

use crate::error::{ApiError, ErrorCode};
use crate::AppState;

pub mod admin;
pub mod orders;

/// JSON body extractor whose rejections use the API error shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// [`ApiJson`] for bodies whose fields are all optional: an empty body
/// means `T::default()`.
#[derive(Debug)]
pub struct OptionalJson<T>(pub T);

impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::new(ErrorCode::ValidationError, e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(T::default()));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(OptionalJson(value))
    }
}

/// `{ "order": <Order> }`
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: Order,
}

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(orders::routes(state.clone()))
        .merge(admin::routes(state.clone()))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.db.health_check().await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
    }
}
