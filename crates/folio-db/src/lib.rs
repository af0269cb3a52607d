//! # folio-db: Database Layer for Folio
//!
//! This crate provides database access for the Folio order engine.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Folio Data Flow                                  │
//! │                                                                         │
//! │  HTTP handler (POST /orders)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     folio-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  ItemRepo     │    │  (embedded)  │  │   │
//! │  │   │               │    │  OrderRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  PricingRepo  │    │ 001_initial  │  │   │
//! │  │   │               │    │  Notification │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                                │   │
//! │  │                        ┌───────▼───────┐                        │   │
//! │  │                        │  StockLedger  │ two-phase reserve      │   │
//! │  │                        │  (ledger.rs)  │ / compensating release │   │
//! │  │                        └───────────────┘                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/folio/folio.db (or :memory: in tests)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (item, order, ...)
//! - [`ledger`] - All-or-nothing stock reservation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_db::{Database, DbConfig, StockRequest};
//!
//! let db = Database::new(DbConfig::new("folio.db")).await?;
//!
//! let policy = db.pricing().current().await?;
//! let reserved = db.ledger().reserve_all(&[StockRequest::new(item_id, 2)]).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ledger::{Reservation, ReservationSet, StockError, StockLedger, StockRequest};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::item::{generate_item_id, ItemRepository};
pub use repository::notification::{NewNotification, NotificationRepository};
pub use repository::order::{generate_order_id, OrderRepository};
pub use repository::pricing::PricingRepository;
