//! # Error Types
//!
//! Domain-specific error types for folio-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  folio-core errors (this file)                                         │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  folio-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── StockError       - Ledger rejection or database failure           │
//! │                                                                         │
//! │  folio-api errors                                                      │
//! │  └── ApiError         - What HTTP callers see ({code, message})        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A checkout line references an unknown item.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// The stock ledger rejected the batch.
    ///
    /// ## User Workflow
    /// ```text
    /// POST /orders  [Atlas ×5, Poster ×1]
    ///      │
    ///      ▼
    /// reserve Atlas: stock=3 < 5 → rejected
    ///      │
    ///      ▼
    /// release every reservation already taken (none here)
    ///      │
    ///      ▼
    /// 400 INSUFFICIENT_STOCK "Insufficient stock for Atlas: ..."
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// No pricing policy has been configured by an administrator.
    #[error("Pricing policy is not configured")]
    ConfigMissing,

    /// Illegal lifecycle move (e.g. delivered → paid).
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Order amounts that break the pricing invariant. Always a bug upstream
    /// of `Order::new`, never a buyer mistake.
    #[error("Order amounts do not reconcile: {0}")]
    InvalidAmounts(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid country code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;
