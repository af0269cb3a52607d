//! # Database Error Types
//!
//! What can go wrong below the services, already sorted into the cases the
//! API needs to tell apart.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error                                                           │
//! │       │  constraint kind + "<table>.<column>" from SQLite's message     │
//! │       ▼                                                                 │
//! │  DbError                                                               │
//! │       │  UniqueViolation, Conflict → 409                                │
//! │       │  NotFound                  → 404                                │
//! │       │  everything else           → 500 (details only in the log)      │
//! │       ▼                                                                 │
//! │  ApiError (folio-api)                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the row: `items.sku`, `orders.reference`,
    /// or a primary key.
    #[error("{entity} with this {field} already exists")]
    UniqueViolation { entity: String, field: String },

    /// Unknown `item_id` on an order, or unknown `order_id` on a
    /// notification.
    #[error("Referenced row does not exist")]
    ForeignKeyViolation,

    /// `items.stock` would drop below zero.
    ///
    /// The ledger's conditional UPDATE never lets this happen, so seeing it
    /// means some writer went around the ledger.
    #[error("Stock for an item would become negative")]
    StockUnderflow,

    /// Any other CHECK constraint (status values, refund bounds, ...).
    #[error("CHECK constraint failed: {constraint}")]
    CheckViolation { constraint: String },

    /// A compare-and-set update lost: the row changed underneath us.
    ///
    /// ## When This Occurs
    /// ```text
    /// Admin A: load order (paid) ──► ship ──► UPDATE … WHERE status='paid' ✓
    /// Admin B: load order (paid) ──► refund ─► UPDATE … WHERE status='paid' ✗
    ///                                                     (now 'shipped')
    /// ```
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Stored data could not be decoded (bad JSON column, invalid policy).
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Sorts a constraint failure reported by SQLite.
    ///
    /// ```text
    /// UNIQUE constraint failed: orders.reference   → UniqueViolation { Order, reference }
    /// UNIQUE constraint failed: items.sku          → UniqueViolation { Item, sku }
    /// CHECK constraint failed: stock >= 0          → StockUnderflow
    /// CHECK constraint failed: <expr>              → CheckViolation
    /// FOREIGN KEY constraint failed                → ForeignKeyViolation
    /// ```
    fn from_database(err: &dyn DatabaseError) -> Self {
        let msg = err.message();

        match err.kind() {
            ErrorKind::UniqueViolation => {
                let (table, column) = unique_target(msg);
                DbError::UniqueViolation {
                    entity: entity_name(table),
                    field: column.to_string(),
                }
            }
            ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation,
            ErrorKind::CheckViolation => {
                let constraint = msg
                    .split_once("CHECK constraint failed: ")
                    .map(|(_, expr)| expr.trim())
                    .unwrap_or(msg);
                if constraint.starts_with("stock") {
                    DbError::StockUnderflow
                } else {
                    DbError::CheckViolation {
                        constraint: constraint.to_string(),
                    }
                }
            }
            _ => DbError::QueryFailed(msg.to_string()),
        }
    }
}

/// First `table.column` pair of a UNIQUE failure. Composite indexes list
/// every column; the first one names the index well enough.
fn unique_target(msg: &str) -> (&str, &str) {
    let target = msg
        .split_once("UNIQUE constraint failed: ")
        .map(|(_, rest)| rest)
        .unwrap_or("");
    let first = target.split(',').next().unwrap_or("").trim();
    match first.split_once('.') {
        Some((table, column)) => (table, column),
        None => ("", first),
    }
}

/// Singular display name for a table.
fn entity_name(table: &str) -> String {
    match table {
        "orders" => "Order".to_string(),
        "items" => "Item".to_string(),
        "notifications" => "Notification".to_string(),
        "pricing_policy" => "Pricing policy".to_string(),
        "" => "Row".to_string(),
        other => other.to_string(),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_database(db_err.as_ref()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("JSON column: {}", err))
    }
}

pub type DbResult<T> = Result<T, DbError>;
