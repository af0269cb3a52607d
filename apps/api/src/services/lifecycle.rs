//! # Lifecycle Service
//!
//! Applies an order transition and its consequences.
//!
//! ```text
//! load (buyer-scoped or any) ─ None → 404
//!   │
//!   ▼
//! pure transition on Order      illegal → 409 InvalidTransition
//!   │
//!   ▼
//! save_transition(order, from)  lost the race → 409 Conflict
//!   │
//!   ├── cancelled before shipment → release the order's stock
//!   ▼
//! dispatch StatusChanged
//! ```

use chrono::{DateTime, Utc};
use tracing::{error, info};

use folio_core::{CoreError, CoreResult, Money, Order, ShippingUpdate, Transition};
use folio_db::{Database, ReservationSet};

use crate::error::ApiResult;
use crate::fulfillment::{FulfillmentEvent, FulfillmentNotifier};

/// Whose orders a caller may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Only orders placed by this buyer.
    Buyer(&'a str),
    /// Any order.
    Admin,
}

#[derive(Debug, Clone)]
pub struct LifecycleService {
    db: Database,
    notifier: FulfillmentNotifier,
}

impl LifecycleService {
    pub fn new(db: Database, notifier: FulfillmentNotifier) -> Self {
        LifecycleService { db, notifier }
    }

    /// Loads one order visible in `scope`.
    pub async fn get(&self, order_id: &str, scope: Scope<'_>) -> ApiResult<Order> {
        let orders = self.db.orders();
        let order = match scope {
            Scope::Buyer(buyer_id) => orders.get_for_buyer(order_id, buyer_id).await?,
            Scope::Admin => orders.get_by_id(order_id).await?,
        };
        order.ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
    }

    pub async fn pay(
        &self,
        order_id: &str,
        transaction_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Order> {
        self.apply(order_id, Scope::Admin, |order| {
            order.mark_as_paid(transaction_id, now)
        })
        .await
    }

    pub async fn update_shipping(
        &self,
        order_id: &str,
        update: ShippingUpdate,
        now: DateTime<Utc>,
    ) -> ApiResult<Order> {
        self.apply(order_id, Scope::Admin, move |order| {
            order.update_shipping_status(update, now)
        })
        .await
    }

    pub async fn refund(
        &self,
        order_id: &str,
        reason: &str,
        amount: Option<Money>,
        now: DateTime<Utc>,
    ) -> ApiResult<Order> {
        self.apply(order_id, Scope::Admin, |order| {
            order.process_refund(reason, amount, now)
        })
        .await
    }

    /// Cancels an order. Stock goes back to the item unless it had shipped.
    pub async fn cancel(
        &self,
        order_id: &str,
        scope: Scope<'_>,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApiResult<Order> {
        self.apply(order_id, scope, |order| order.cancel(reason, now))
            .await
    }

    async fn apply<F>(&self, order_id: &str, scope: Scope<'_>, transition: F) -> ApiResult<Order>
    where
        F: FnOnce(&mut Order) -> CoreResult<Transition>,
    {
        let mut order = self.get(order_id, scope).await?;
        let transition = transition(&mut order)?;
        let from = transition.from;

        self.db.orders().save_transition(&order, from).await?;
        info!(order_id = %order.id, from = %from, to = %transition.to, "Order transitioned");

        if transition.releases_stock() {
            if let Err(e) = self
                .db
                .ledger()
                .release_all(ReservationSet::for_order(&order))
                .await
            {
                error!(order_id = %order.id, error = %e, "Failed to restore stock for cancelled order");
            }
        }

        self.notifier.dispatch(FulfillmentEvent::StatusChanged {
            order: order.clone(),
            from,
        });

        Ok(order)
    }
}
