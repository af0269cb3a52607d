//! # Checkout Service
//!
//! Turns a cart into persisted orders, one per line.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Checkout                                       │
//! │                                                                         │
//! │  1. VALIDATE (no mutation yet)                                         │
//! │     ├── 1..=100 lines, each quantity 1..=999, item id is a UUID        │
//! │     ├── shipping address present and well-formed                       │
//! │     └── method known, notes bounded                                    │
//! │                                                                         │
//! │  2. POLICY SNAPSHOT                                                    │
//! │     ├── no policy row           → ConfigMissing (500)                  │
//! │     ├── method toggled off      → 400                                  │
//! │     └── country not allowed     → 400                                  │
//! │                                                                         │
//! │  3. PRICE                                                              │
//! │     └── catalogue lookup, allocate(lines, policy)                      │
//! │                                                                         │
//! │  4. RESERVE     ledger.reserve_all    all items or none                │
//! │                                                                         │
//! │  5. PERSIST     orders.insert_batch   one transaction                  │
//! │     └── on failure: ledger.release_all, then return the error          │
//! │                                                                         │
//! │  6. DISPATCH    notifier.dispatch(OrderPlaced)   never blocks          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use folio_core::validation::{
    validate_line_count, validate_notes, validate_quantity, validate_shipping_address,
    validate_uuid,
};
use folio_core::{
    allocate, AllocatedLine, CoreError, Item, NewOrder, Order, OrderTotals, PaymentMethod,
    PricedLine, PricingPolicy, ShippingAddress, ValidationError,
};
use folio_db::{generate_order_id, Database, ReservationSet, StockRequest};

use crate::error::ApiResult;
use crate::fulfillment::{FulfillmentEvent, FulfillmentNotifier};

// =============================================================================
// Request / Outcome
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub item_id: String,
    pub quantity: i64,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutLine>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// What a successful checkout created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub checkout_id: String,
    pub currency: String,
    pub totals: OrderTotals,
    pub orders: Vec<Order>,
}

/// A request that passed validation.
struct ValidCheckout {
    lines: Vec<CheckoutLine>,
    address: ShippingAddress,
    method: PaymentMethod,
    notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    notifier: FulfillmentNotifier,
}

impl CheckoutService {
    pub fn new(db: Database, notifier: FulfillmentNotifier) -> Self {
        CheckoutService { db, notifier }
    }

    /// Runs a checkout for `buyer_id`.
    ///
    /// Validation, policy and stock failures leave the database untouched.
    /// Notification failures never reach the caller.
    pub async fn checkout(
        &self,
        buyer_id: &str,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> ApiResult<CheckoutOutcome> {
        let request = validate_request(request)?;

        let policy = PricingPolicy::require(self.db.pricing().current().await?)?;
        if !policy.accepts(request.method) {
            return Err(ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: PaymentMethod::ALL
                    .into_iter()
                    .filter(|m| policy.accepts(*m))
                    .map(|m| m.to_string())
                    .collect(),
            }
            .into());
        }
        if !policy.ships_to(&request.address.country) {
            return Err(ValidationError::NotAllowed {
                field: "shippingAddress.country".to_string(),
                allowed: policy.settings().allowed_countries.clone(),
            }
            .into());
        }

        let priced = self.price_lines(&request.lines).await?;
        let allocation = allocate(&priced, &policy)?;

        let requests: Vec<StockRequest> = request
            .lines
            .iter()
            .map(|line| StockRequest::new(line.item_id.clone(), line.quantity))
            .collect();
        let reservations = self.db.ledger().reserve_all(&requests).await?;

        let checkout_uuid = Uuid::new_v4();
        let checkout_id = checkout_uuid.to_string();
        let orders = match build_orders(
            &allocation.lines,
            &request,
            &policy,
            buyer_id,
            &checkout_uuid,
            now,
        ) {
            Ok(orders) => orders,
            Err(e) => {
                self.rollback(&checkout_id, reservations).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.db.orders().insert_batch(&orders).await {
            self.rollback(&checkout_id, reservations).await;
            return Err(e.into());
        }

        info!(
            checkout_id = %checkout_id,
            buyer_id = %buyer_id,
            orders = orders.len(),
            method = %request.method,
            final_total = allocation.totals.final_total.cents(),
            "Checkout completed"
        );

        self.notifier.dispatch(FulfillmentEvent::OrderPlaced {
            orders: orders.clone(),
            totals: allocation.totals,
        });

        Ok(CheckoutOutcome {
            checkout_id,
            currency: policy.currency().to_string(),
            totals: allocation.totals,
            orders,
        })
    }

    /// Resolves catalogue prices and titles, in request order.
    async fn price_lines(&self, lines: &[CheckoutLine]) -> ApiResult<Vec<PricedLine>> {
        let ids: Vec<String> = lines.iter().map(|l| l.item_id.clone()).collect();
        let items = self.db.items().get_many(&ids).await?;

        lines
            .iter()
            .map(|line| -> ApiResult<PricedLine> {
                let item = find_item(&items, &line.item_id)?;
                Ok(PricedLine {
                    item_id: item.id.clone(),
                    title: item.title.clone(),
                    quantity: line.quantity,
                    unit_price: item.price(),
                })
            })
            .collect()
    }

    async fn rollback(&self, checkout_id: &str, reservations: ReservationSet) {
        warn!(checkout_id = %checkout_id, "Persisting orders failed, releasing stock");
        if let Err(e) = self.db.ledger().release_all(reservations).await {
            error!(checkout_id = %checkout_id, error = %e, "Stock release after failed checkout incomplete");
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_request(request: CheckoutRequest) -> Result<ValidCheckout, CoreError> {
    if request.items.len() > folio_core::MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: folio_core::MAX_CART_ITEMS,
        });
    }
    validate_line_count(request.items.len())?;

    for line in &request.items {
        validate_uuid("itemId", &line.item_id)?;
        if line.quantity > folio_core::MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: line.quantity,
                max: folio_core::MAX_ITEM_QUANTITY,
            });
        }
        validate_quantity(line.quantity)?;
    }

    let address = request
        .shipping_address
        .ok_or_else(|| ValidationError::Required {
            field: "shippingAddress".to_string(),
        })?;
    validate_shipping_address(&address)?;

    if request.method.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "method".to_string(),
        }
        .into());
    }
    let method: PaymentMethod = request.method.trim().parse()?;

    validate_notes(request.notes.as_deref())?;
    let notes = request
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(ValidCheckout {
        lines: request.items,
        address,
        method,
        notes,
    })
}

fn find_item<'a>(items: &'a [Item], item_id: &str) -> Result<&'a Item, CoreError> {
    items
        .iter()
        .find(|item| item.id == item_id)
        .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))
}

/// `YYMMDD-HHMMSS-<checkout>-<line>`: the first 8 hex digits of the checkout
/// id keep same-second checkouts apart, and the zero-padded line number
/// sorts as text (`MAX_CART_ITEMS` fits in three digits).
fn order_reference(now: DateTime<Utc>, checkout_id: &Uuid, line: usize) -> String {
    let checkout = checkout_id.simple().to_string();
    format!(
        "{}-{}-{:03}",
        now.format("%y%m%d-%H%M%S"),
        checkout[..8].to_uppercase(),
        line
    )
}

fn build_orders(
    lines: &[AllocatedLine],
    request: &ValidCheckout,
    policy: &PricingPolicy,
    buyer_id: &str,
    checkout_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<Order>, CoreError> {
    let estimated_delivery = policy.estimated_delivery(now);

    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let mut order = Order::new(
                NewOrder {
                    id: generate_order_id(),
                    reference: order_reference(now, checkout_id, index + 1),
                    checkout_id: checkout_id.to_string(),
                    buyer_id: buyer_id.to_string(),
                    item_id: line.item_id.clone(),
                    item_title: line.title.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    line_subtotal: line.line_subtotal,
                    tax: line.tax,
                    shipping: line.shipping,
                    final_amount: line.final_amount,
                    currency: policy.currency().to_string(),
                    payment_method: request.method,
                    shipping_address: request.address.clone(),
                    notes: request.notes.clone(),
                    estimated_delivery: Some(estimated_delivery),
                },
                now,
            )?;

            if request.method.settles_at_checkout() {
                let transaction_id = format!("txn_{}", Uuid::new_v4().simple());
                order.mark_as_paid(&transaction_id, now)?;
            }

            Ok(order)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Reader".to_string(),
            line1: "1 Library Way".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            region: None,
            postal_code: "62701".to_string(),
            country: "US".to_string(),
            phone: None,
        }
    }

    fn request(quantity: i64) -> CheckoutRequest {
        CheckoutRequest {
            items: vec![CheckoutLine {
                item_id: Uuid::new_v4().to_string(),
                quantity,
            }],
            shipping_address: Some(address()),
            method: "card".to_string(),
            notes: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_order_reference_format() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 14, 9, 26, 53)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        let checkout = Uuid::parse_str("9f2c41d0-7a3b-4c1e-8d2f-0123456789ab").unwrap();
        assert_eq!(order_reference(now, &checkout, 2), "260314-092653-9F2C41D0-002");
        assert_eq!(order_reference(now, &checkout, 100), "260314-092653-9F2C41D0-100");
    }

    #[test]
    fn test_order_references_differ_across_checkouts_in_one_instant() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let first = order_reference(now, &Uuid::new_v4(), 1);
        let second = order_reference(now, &Uuid::new_v4(), 1);
        assert_ne!(first, second);
    }

    #[test]
    fn test_order_references_sort_in_line_order() {
        let now = Utc::now();
        let checkout = Uuid::new_v4();
        let references: Vec<String> = (1..=12)
            .map(|line| order_reference(now, &checkout, line))
            .collect();
        let mut sorted = references.clone();
        sorted.sort();
        assert_eq!(sorted, references);
    }

    #[test]
    fn test_validation_accepts_well_formed_request() {
        let valid = validate_request(request(3)).unwrap();
        assert_eq!(valid.method, PaymentMethod::Card);
        assert_eq!(valid.notes, None);
    }

    #[test]
    fn test_validation_rejects_bad_quantities() {
        assert!(validate_request(request(0)).is_err());
        assert!(validate_request(request(-2)).is_err());
        assert!(matches!(
            validate_request(request(1000)),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_validation_requires_address_and_method() {
        let mut req = request(1);
        req.shipping_address = None;
        assert!(validate_request(req).is_err());

        let mut req = request(1);
        req.method = "paypal".to_string();
        assert!(validate_request(req).is_err());

        let mut req = request(1);
        req.items.clear();
        assert!(validate_request(req).is_err());
    }
}
