//! # Repository Module
//!
//! Database repository implementations for Folio.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Service (folio-api)                                                   │
//! │       │                                                                 │
//! │       │  db.orders().list_for_buyer("buyer-1", None)                   │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── insert_batch(&self, orders)                                       │
//! │  ├── get_for_buyer(&self, id, buyer)                                   │
//! │  └── save_transition(&self, order, previous)                           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`](item::ItemRepository) - Catalogue reads, conditional stock ops
//! - [`OrderRepository`](order::OrderRepository) - Orders and lifecycle persistence
//! - [`PricingRepository`](pricing::PricingRepository) - Pricing policy singleton
//! - [`NotificationRepository`](notification::NotificationRepository) - Stored notifications

pub mod item;
pub mod notification;
pub mod order;
pub mod pricing;
