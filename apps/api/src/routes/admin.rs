//! Administrator lifecycle endpoints. Every route requires the admin role.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{middleware, Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use folio_core::{Money, OrderStatus, ShippingUpdate};

use super::orders::CancelRequest;
use super::{ApiJson, OptionalJson, OrderResponse};
use crate::auth::require_admin;
use crate::error::ApiResult;
use crate::services::Scope;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/orders/{id}/pay", post(pay_order))
        .route("/admin/orders/{id}/shipping", post(update_shipping))
        .route("/admin/orders/{id}/refund", post(refund_order))
        .route("/admin/orders/{id}/cancel", post(cancel_order))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    #[serde(default)]
    pub transaction_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRequest {
    pub status: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    #[serde(default)]
    pub reason: String,
    /// Minor units. Defaults to the order's final amount.
    #[serde(default)]
    pub amount: Option<Money>,
}

async fn pay_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<PayRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state
        .lifecycle()
        .pay(&id, &request.transaction_id, Utc::now())
        .await?;
    Ok(Json(OrderResponse { order }))
}

async fn update_shipping(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ShippingRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let update = ShippingUpdate {
        status: request.status.trim().parse::<OrderStatus>()?,
        tracking_number: request.tracking_number,
        estimated_delivery: request.estimated_delivery,
    };

    let order = state
        .lifecycle()
        .update_shipping(&id, update, Utc::now())
        .await?;
    Ok(Json(OrderResponse { order }))
}

async fn refund_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RefundRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state
        .lifecycle()
        .refund(&id, &request.reason, request.amount, Utc::now())
        .await?;
    Ok(Json(OrderResponse { order }))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<CancelRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state
        .lifecycle()
        .cancel(&id, Scope::Admin, request.reason.as_deref(), Utc::now())
        .await?;
    Ok(Json(OrderResponse { order }))
}
