//! # Order Lifecycle
//!
//! The order state machine and the transition methods on [`Order`].
//!
//! ## State Graph
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ──► paid ──► processing ──► shipped ──► delivered            │
//! │      │         │  ╲         │      ╱     │           │                  │
//! │      │         │   ╲────────┼─────╱      │           │                  │
//! │      │         │  (forward skips allowed)│           │                  │
//! │      ▼         ▼            ▼            ▼           │                  │
//! │   ┌──────────────────────────────────────────┐       │                  │
//! │   │               cancelled                  │       │                  │
//! │   └──────────────────────────────────────────┘       │                  │
//! │                ▼            ▼            ▼           ▼                  │
//! │             ┌──────────────────────────────────────────┐                │
//! │             │  refunded  (from paid and later)         │                │
//! │             └──────────────────────────────────────────┘                │
//! │                                                                         │
//! │   cancelled, refunded: final. delivered: only refund.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transition methods are pure: they take `now`, mutate the in-memory
//! order and return the [`Transition`] that happened. Persisting it (with a
//! compare-and-set on the previous status) is the repository's job.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Order, OrderStatus};
use crate::validation::{
    validate_cancel_reason, validate_refund_reason, validate_tracking_number,
    validate_transaction_id,
};

// =============================================================================
// State Machine
// =============================================================================

impl OrderStatus {
    /// Position along the fulfillment path, `None` off the path.
    const fn fulfillment_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Paid => Some(1),
            OrderStatus::Processing => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled | OrderStatus::Refunded => None,
        }
    }

    /// No transition ever leaves a final state.
    pub const fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        if self.is_final() {
            return false;
        }

        match (*self, next) {
            (Pending, Paid) => true,
            (Pending | Paid | Processing | Shipped, Cancelled) => true,
            (Paid | Processing | Shipped | Delivered, Refunded) => true,
            // Forward moves after payment; pending must be paid first.
            (Paid | Processing | Shipped, Processing | Shipped | Delivered) => {
                match (self.fulfillment_rank(), next.fulfillment_rank()) {
                    (Some(from), Some(to)) => to > from,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

/// A status change that was applied to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl Transition {
    /// Cancelling before shipment hands the units back to the item.
    pub fn releases_stock(&self) -> bool {
        self.to == OrderStatus::Cancelled && self.from != OrderStatus::Shipped
    }
}

/// Arguments of [`Order::update_shipping_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingUpdate {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

// =============================================================================
// Transitions
// =============================================================================

impl Order {
    fn transition(&mut self, to: OrderStatus, now: DateTime<Utc>) -> CoreResult<Transition> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                order_id: self.id.clone(),
                from,
                to,
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(Transition { from, to })
    }

    /// Settles a pending order.
    pub fn mark_as_paid(
        &mut self,
        transaction_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition> {
        validate_transaction_id(transaction_id)?;
        let transition = self.transition(OrderStatus::Paid, now)?;
        self.transaction_id = Some(transaction_id.trim().to_string());
        self.paid_at = Some(now);
        Ok(transition)
    }

    /// Moves a paid order forward to `processing`, `shipped` or `delivered`.
    ///
    /// Tracking number and estimated delivery overwrite earlier values
    /// when given.
    pub fn update_shipping_status(
        &mut self,
        update: ShippingUpdate,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition> {
        if !matches!(
            update.status,
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
        ) {
            return Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![
                    OrderStatus::Processing.to_string(),
                    OrderStatus::Shipped.to_string(),
                    OrderStatus::Delivered.to_string(),
                ],
            }
            .into());
        }
        validate_tracking_number(update.tracking_number.as_deref())?;

        let transition = self.transition(update.status, now)?;
        match update.status {
            OrderStatus::Shipped => self.shipped_at = Some(now),
            OrderStatus::Delivered => self.delivered_at = Some(now),
            _ => {}
        }
        if let Some(tracking) = update.tracking_number {
            self.tracking_number = Some(tracking.trim().to_string());
        }
        if let Some(estimate) = update.estimated_delivery {
            self.estimated_delivery = Some(estimate);
        }
        Ok(transition)
    }

    /// Refunds the order. `amount` defaults to the final amount.
    ///
    /// ## Rules
    /// - `reason` must not be blank
    /// - `0 < amount <= final_amount`
    pub fn process_refund(
        &mut self,
        reason: &str,
        amount: Option<Money>,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition> {
        validate_refund_reason(reason)?;
        let final_amount = self.final_amount();
        let amount = amount.unwrap_or(final_amount);
        if !amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "amount".to_string(),
            }
            .into());
        }
        if amount > final_amount {
            return Err(ValidationError::OutOfRange {
                field: "amount".to_string(),
                min: 1,
                max: final_amount.cents(),
            }
            .into());
        }

        let transition = self.transition(OrderStatus::Refunded, now)?;
        self.refund_reason = Some(reason.trim().to_string());
        self.refund_amount_cents = Some(amount.cents());
        self.refunded_at = Some(now);
        Ok(transition)
    }

    pub fn cancel(&mut self, reason: Option<&str>, now: DateTime<Utc>) -> CoreResult<Transition> {
        validate_cancel_reason(reason)?;
        let transition = self.transition(OrderStatus::Cancelled, now)?;
        self.cancelled_at = Some(now);
        self.cancel_reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        Ok(transition)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
