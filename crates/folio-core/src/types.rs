//! # Domain Types
//!
//! Core domain types used throughout Folio.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │      Order      │   │  Notification   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  reference      │   │  recipient      │       │
//! │  │  title          │   │  checkout_id    │   │  audience       │       │
//! │  │  price_cents    │   │  status         │   │  kind           │       │
//! │  │  stock          │   │  final_amount   │   │  order_id (FK)  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  OrderStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Pending        │   │  CashOnDelivery │       │
//! │  │  600 = 6%       │   │  Paid ...       │   │  Card           │       │
//! │  └─────────────────┘   │  Refunded       │   │  BankTransfer   │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, order reference) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::validate_quantity;
use crate::ROUNDING_TOLERANCE_CENTS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 600 bps = 6%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Upper bound: 100%.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Item
// =============================================================================

/// A sellable catalogue item (book, poster, ebook).
///
/// Items are owned by the catalogue; this engine only reads them and moves
/// their `stock` counter through the stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display title shown on orders and receipts.
    pub title: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Units available for sale. Never negative.
    pub stock: i64,

    /// Inactive items cannot be ordered.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Buyer pays the courier.
    CashOnDelivery,
    /// Settled by the card processor at checkout.
    Card,
    /// Confirmed manually once the transfer lands.
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::CashOnDelivery,
        PaymentMethod::Card,
        PaymentMethod::BankTransfer,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }

    /// Whether checkout settles the order immediately.
    pub const fn settles_at_checkout(&self) -> bool {
        matches!(self, PaymentMethod::Card)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: PaymentMethod::ALL.iter().map(|m| m.to_string()).collect(),
            })
    }
}

/// Which payment methods the storefront currently accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodToggles {
    pub cash_on_delivery: bool,
    pub card: bool,
    pub bank_transfer: bool,
}

impl PaymentMethodToggles {
    pub fn is_enabled(&self, method: PaymentMethod) -> bool {
        match method {
            PaymentMethod::CashOnDelivery => self.cash_on_delivery,
            PaymentMethod::Card => self.card,
            PaymentMethod::BankTransfer => self.bank_transfer,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.cash_on_delivery || self.card || self.bank_transfer
    }
}

impl Default for PaymentMethodToggles {
    fn default() -> Self {
        PaymentMethodToggles {
            cash_on_delivery: true,
            card: true,
            bank_transfer: false,
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle state of an order. Transition rules live in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Shipping Address
// =============================================================================

/// Where an order is delivered. Stored on every order of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    /// ISO-3166 alpha-2.
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Single-line rendering for receipts.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.full_name.as_str(), self.line1.as_str()];
        if let Some(line2) = self.line2.as_deref() {
            parts.push(line2);
        }
        parts.push(self.city.as_str());
        if let Some(region) = self.region.as_deref() {
            parts.push(region);
        }
        parts.push(self.postal_code.as_str());
        parts.push(self.country.as_str());
        parts.join(", ")
    }
}

// =============================================================================
// Order
// =============================================================================

/// One persisted order. A checkout creates one per line item, all sharing a
/// `checkout_id`.
///
/// ## Amount Invariant
/// ```text
/// final_amount = line_subtotal + tax + shipping   (± ROUNDING_TOLERANCE_CENTS)
/// refund_amount <= final_amount
/// ```
///
/// Item title and unit price are snapshots taken at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    /// Human-readable reference: `YYMMDD-HHMMSS-<checkout prefix>-<line#>`.
    pub reference: String,
    pub checkout_id: String,
    pub buyer_id: String,
    pub item_id: String,
    pub item_title: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub final_amount_cents: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub refund_reason: Option<String>,
    pub refund_amount_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub refunded_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_subtotal(&self) -> Money {
        Money::from_cents(self.line_subtotal_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn shipping(&self) -> Money {
        Money::from_cents(self.shipping_cents)
    }

    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_cents(self.final_amount_cents)
    }

    pub fn refund_amount(&self) -> Option<Money> {
        self.refund_amount_cents.map(Money::from_cents)
    }

    /// Checks the amount invariant.
    pub fn amounts_reconcile(&self) -> bool {
        let expected = self.line_subtotal() + self.tax() + self.shipping();
        (self.final_amount() - expected).cents().abs() <= ROUNDING_TOLERANCE_CENTS
    }

    /// Builds a pending order, rejecting amounts that do not add up.
    ///
    /// ```text
    /// quantity       1..=MAX_ITEM_QUANTITY
    /// line_subtotal  == unit_price × quantity
    /// tax, shipping  >= 0
    /// final_amount   == line_subtotal + tax + shipping   (± tolerance)
    /// ```
    pub fn new(new: NewOrder, now: DateTime<Utc>) -> CoreResult<Order> {
        validate_quantity(new.quantity)?;

        for (field, amount) in [
            ("unit price", new.unit_price),
            ("tax", new.tax),
            ("shipping", new.shipping),
        ] {
            if amount.cents() < 0 {
                return Err(CoreError::InvalidAmounts(format!(
                    "{} is negative ({})",
                    field, amount
                )));
            }
        }

        let expected_subtotal = new.unit_price * new.quantity;
        if new.line_subtotal != expected_subtotal {
            return Err(CoreError::InvalidAmounts(format!(
                "line subtotal {} != {} × {}",
                new.line_subtotal, new.unit_price, new.quantity
            )));
        }

        let order = Order {
            id: new.id,
            reference: new.reference,
            checkout_id: new.checkout_id,
            buyer_id: new.buyer_id,
            item_id: new.item_id,
            item_title: new.item_title,
            quantity: new.quantity,
            unit_price_cents: new.unit_price.cents(),
            line_subtotal_cents: new.line_subtotal.cents(),
            tax_cents: new.tax.cents(),
            shipping_cents: new.shipping.cents(),
            final_amount_cents: new.final_amount.cents(),
            currency: new.currency,
            payment_method: new.payment_method,
            transaction_id: None,
            shipping_address: new.shipping_address,
            notes: new.notes,
            status: OrderStatus::Pending,
            tracking_number: None,
            estimated_delivery: new.estimated_delivery,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            cancel_reason: None,
            refund_reason: None,
            refund_amount_cents: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };

        if !order.amounts_reconcile() {
            return Err(CoreError::InvalidAmounts(format!(
                "final amount {} != {} + {} + {}",
                order.final_amount(),
                order.line_subtotal(),
                order.tax(),
                order.shipping()
            )));
        }

        Ok(order)
    }
}

/// What checkout decides about one line before it becomes an [`Order`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: String,
    pub reference: String,
    pub checkout_id: String,
    pub buyer_id: String,
    pub item_id: String,
    pub item_title: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub final_amount: Money,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

// =============================================================================
// Notifications
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAudience {
    Buyer,
    Admin,
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Buyer confirmation after checkout.
    OrderPlaced,
    /// Admin notice of a new order.
    NewOrder,
    /// Buyer notice of a lifecycle transition.
    OrderStatusChanged,
}

/// An in-app notification written by the fulfillment worker.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// Buyer id, or the configured admin recipient.
    pub recipient: String,
    pub audience: NotificationAudience,
    pub kind: NotificationKind,
    pub order_id: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(600);
        assert_eq!(rate.bps(), 600);
        assert!((rate.percentage() - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_payment_method_parse() {
        let method: PaymentMethod = "cash_on_delivery".parse().unwrap();
        assert_eq!(method, PaymentMethod::CashOnDelivery);
        assert_eq!(method.to_string(), "cash_on_delivery");
        assert!("paypal".parse::<PaymentMethod>().is_err());
        assert!(PaymentMethod::Card.settles_at_checkout());
    }

    #[test]
    fn test_payment_toggles() {
        let toggles = PaymentMethodToggles {
            cash_on_delivery: false,
            card: true,
            bank_transfer: false,
        };
        assert!(toggles.is_enabled(PaymentMethod::Card));
        assert!(!toggles.is_enabled(PaymentMethod::CashOnDelivery));
        assert!(toggles.any_enabled());
    }

    fn new_order(quantity: i64, tax: i64, final_amount: i64) -> NewOrder {
        NewOrder {
            id: "o-1".to_string(),
            reference: "260314-092653-9F2C41D0-001".to_string(),
            checkout_id: "c-1".to_string(),
            buyer_id: "buyer-1".to_string(),
            item_id: "i-1".to_string(),
            item_title: "Atlas".to_string(),
            quantity,
            unit_price: Money::from_cents(2000),
            line_subtotal: Money::from_cents(2000 * quantity),
            tax: Money::from_cents(tax),
            shipping: Money::from_cents(1500),
            final_amount: Money::from_cents(final_amount),
            currency: "USD".to_string(),
            payment_method: PaymentMethod::Card,
            shipping_address: address(),
            notes: None,
            estimated_delivery: None,
        }
    }

    #[test]
    fn test_new_order_is_pending_and_reconciles() {
        let now = Utc::now();
        let order = Order::new(new_order(3, 360, 7860), now).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.line_subtotal_cents, 6000);
        assert_eq!(order.created_at, now);
        assert!(order.amounts_reconcile());

        // One cent of rounding drift is tolerated.
        assert!(Order::new(new_order(3, 360, 7861), now).is_ok());
    }

    #[test]
    fn test_new_order_rejects_amounts_that_do_not_add_up() {
        let now = Utc::now();
        assert!(matches!(
            Order::new(new_order(3, 360, 7900), now),
            Err(CoreError::InvalidAmounts(_))
        ));
        assert!(matches!(
            Order::new(new_order(3, -10, 7490), now),
            Err(CoreError::InvalidAmounts(_))
        ));

        let mut bad_subtotal = new_order(3, 360, 7860);
        bad_subtotal.line_subtotal = Money::from_cents(5999);
        assert!(matches!(
            Order::new(bad_subtotal, now),
            Err(CoreError::InvalidAmounts(_))
        ));

        assert!(matches!(
            Order::new(new_order(0, 0, 1500), now),
            Err(CoreError::Validation(_))
        ));
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            line1: "12 St James's Square".to_string(),
            line2: None,
            city: "London".to_string(),
            region: None,
            postal_code: "SW1Y 4JH".to_string(),
            country: "GB".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_address_one_line() {
        assert_eq!(
            address().one_line(),
            "Ada Lovelace, 12 St James's Square, London, SW1Y 4JH, GB"
        );
    }
}
