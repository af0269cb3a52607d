//! Buyer-facing order endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use folio_core::{Order, OrderStatus, OrderTotals};

use super::{ApiJson, OptionalJson, OrderResponse};
use crate::auth::{require_auth, AuthUser};
use crate::error::ApiResult;
use crate::services::{CheckoutRequest, Scope};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

// =============================================================================
// Wire Types
// =============================================================================

/// Checkout-level summary returned next to the created orders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub checkout_id: String,
    pub currency: String,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order: OrderSummary,
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<CreateOrderResponse>)> {
    let outcome = state.checkout().checkout(&user.id, request, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order: OrderSummary {
                checkout_id: outcome.checkout_id,
                currency: outcome.currency,
                totals: outcome.totals,
            },
            orders: outcome.orders,
        }),
    ))
}

async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListOrdersQuery>,
) -> ApiResult<Json<OrderListResponse>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<OrderStatus>()?),
    };

    let orders = state.db.orders().list_for_buyer(&user.id, status).await?;
    Ok(Json(OrderListResponse { orders }))
}

async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state.lifecycle().get(&id, Scope::Buyer(&user.id)).await?;
    Ok(Json(OrderResponse { order }))
}

async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<CancelRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state
        .lifecycle()
        .cancel(
            &id,
            Scope::Buyer(&user.id),
            request.reason.as_deref(),
            Utc::now(),
        )
        .await?;
    Ok(Json(OrderResponse { order }))
}
