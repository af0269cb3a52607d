//! # Service Layer
//!
//! Orchestration between the HTTP handlers, the pure core and the database.
//!
//! ```text
//! routes ──► CheckoutService  ── validate → policy → ledger → allocate → persist → dispatch
//!       └──► LifecycleService ── load → transition → compare-and-set → release? → dispatch
//! ```
//!
//! Services take `now` from the caller so time-dependent output (references,
//! timestamps, delivery estimates) is deterministic under test.

pub mod checkout;
pub mod lifecycle;

pub use checkout::{CheckoutLine, CheckoutOutcome, CheckoutRequest, CheckoutService};
pub use lifecycle::{LifecycleService, Scope};
