//! # API Errors
//!
//! Everything a handler can fail with, rendered as
//! `{ "code": "<SCREAMING_SNAKE>", "message": "<text>" }`.
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────────────────────┬────────┐
//! │ code                                 │ status │
//! ├──────────────────────────────────────┼────────┤
//! │ VALIDATION_ERROR, INSUFFICIENT_STOCK │ 400    │
//! │ UNAUTHORIZED                         │ 401    │
//! │ FORBIDDEN                            │ 403    │
//! │ NOT_FOUND                            │ 404    │
//! │ INVALID_TRANSITION, CONFLICT         │ 409    │
//! │ CONFIG_MISSING, DATABASE_ERROR,      │ 500    │
//! │ INTERNAL                             │        │
//! └──────────────────────────────────────┴────────┘
//! ```
//!
//! Server-side failures are logged with their details; the response only
//! carries a generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

use folio_core::{CoreError, ValidationError};
use folio_db::{DbError, StockError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InsufficientStock,
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidTransition,
    Conflict,
    ConfigMissing,
    DatabaseError,
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError | ErrorCode::InsufficientStock => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidTransition | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ConfigMissing | ErrorCode::DatabaseError | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// API error returned by every handler.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = ?self.code, message = %self.message, "Request failed");
        } else {
            debug!(code = ?self.code, message = %self.message, "Request rejected");
        }
        (status, Json(self)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::new(ErrorCode::ValidationError, err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            // Unknown item ids are a malformed request, not a missing resource.
            CoreError::ItemNotFound(_)
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::Validation(_) => {
                ApiError::new(ErrorCode::ValidationError, err.to_string())
            }
            CoreError::OrderNotFound(_) => ApiError::not_found(err.to_string()),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::ConfigMissing => {
                error!("Checkout attempted without a pricing policy");
                ApiError::new(ErrorCode::ConfigMissing, err.to_string())
            }
            CoreError::InvalidTransition { .. } => {
                ApiError::new(ErrorCode::InvalidTransition, err.to_string())
            }
            CoreError::InvalidAmounts(_) => {
                error!(error = %err, "Refusing to persist an order");
                ApiError::internal("Internal error")
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DbError::Conflict { .. } => ApiError::new(
                ErrorCode::Conflict,
                "The order was modified concurrently; reload it and retry",
            ),
            DbError::UniqueViolation { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            other => {
                error!(error = %other, "Database failure");
                ApiError::new(ErrorCode::DatabaseError, "Database error")
            }
        }
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Rejected(core) => core.into(),
            StockError::Db(db) => db.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorCode::ValidationError, rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::OrderStatus;

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = CoreError::InsufficientStock {
            item_id: "i-1".to_string(),
            name: "Atlas".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Atlas"));

        let err: ApiError = CoreError::ConfigMissing.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiError = CoreError::InvalidTransition {
            order_id: "o-1".to_string(),
            from: OrderStatus::Delivered,
            to: OrderStatus::Paid,
        }
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = CoreError::ItemNotFound("nope".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_db_error_hides_details() {
        let err: ApiError = DbError::QueryFailed("disk I/O error at page 7".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database error");

        let err: ApiError = DbError::conflict("Order", "o-1").into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = DbError::UniqueViolation {
            entity: "Item".to_string(),
            field: "sku".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message, "Item with this sku already exists");

        let err: ApiError = DbError::StockUnderflow.into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn test_unreconciled_order_is_internal() {
        let err: ApiError = CoreError::InvalidAmounts("final amount 1.00 != 2.00".to_string()).into();
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "Internal error");
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ApiError::forbidden("Admin role required")).unwrap();
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(body["message"], "Admin role required");
    }
}
