//! # folio-core: Pure Business Logic for Folio
//!
//! Pricing, allocation and the order lifecycle, as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Folio Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    folio-api (HTTP, axum)                       │   │
//! │  │    POST /orders ──► checkout ──► fulfillment worker            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ folio-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │allocation │  │ lifecycle │  │ validation│  │   │
//! │  │   │  Policy   │  │ per-line  │  │   Order   │  │   rules   │  │   │
//! │  │   │ tax/ship  │  │  shares   │  │  states   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    folio-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, stock ledger               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Order, OrderStatus, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - PricingPolicy snapshot: tax, shipping, totals
//! - [`allocation`] - Proportional split of tax/shipping across lines
//! - [`lifecycle`] - Order state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use folio_core::money::Money;
//! use folio_core::types::TaxRate;
//!
//! let subtotal = Money::from_cents(6000);
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(600));
//! assert_eq!(tax.cents(), 360);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{allocate, AllocatedLine, Allocation, OrderTotals, PricedLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::{ShippingUpdate, Transition};
pub use money::Money;
pub use pricing::{PricingPolicy, PricingSettings};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single item in one checkout.
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Allowed drift between an order's final amount and its parts.
pub const ROUNDING_TOLERANCE_CENTS: i64 = 1;
