//! Shared fixtures for the repository and ledger tests.

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use crate::pool::{Database, DbConfig};
use folio_core::{
    Item, Money, NewOrder, Order, PaymentMethod, PaymentMethodToggles, PricingPolicy,
    PricingSettings, ShippingAddress, TaxRate,
};

/// A fresh, migrated, isolated in-memory database.
pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// A migrated file database in its own temporary directory: WAL journal
/// and `max_connections` pooled connections. Keep the `TempDir` alive for
/// as long as the database is used.
pub(crate) async fn file_db(max_connections: u32) -> (Database, TempDir) {
    let dir = TempDir::new().expect("temporary directory");
    let db = Database::new(DbConfig::new(dir.path().join("folio.db")).max_connections(max_connections))
        .await
        .expect("file database");
    (db, dir)
}

/// An active item titled `Title {sku}`.
pub(crate) fn sample_item(sku: &str, price_cents: i64, stock: i64) -> Item {
    let now = Utc::now();
    Item {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        title: format!("Title {}", sku),
        price_cents,
        stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// 6% tax, 15.00 shipping, free shipping from 100.00.
pub(crate) fn sample_policy() -> PricingPolicy {
    PricingPolicy::new(
        PricingSettings {
            tax_rate: TaxRate::from_bps(600),
            currency: "USD".to_string(),
            shipping_fee: Money::from_cents(1500),
            free_shipping_threshold: Some(Money::from_cents(10_000)),
            estimated_delivery_days: 5,
            allowed_countries: vec!["US".to_string(), "CA".to_string()],
            payment_methods: PaymentMethodToggles::default(),
        },
        Utc::now(),
    )
    .expect("valid policy")
}

pub(crate) fn sample_address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ada Reader".to_string(),
        line1: "1 Library Way".to_string(),
        line2: None,
        city: "Springfield".to_string(),
        region: Some("IL".to_string()),
        postal_code: "62701".to_string(),
        country: "US".to_string(),
        phone: None,
    }
}

/// A pending cash-on-delivery order for three units at the item's price,
/// priced like [`sample_policy`] with shipping charged on this line.
pub(crate) fn sample_order(item: &Item, buyer_id: &str, checkout_id: &str, line: usize) -> Order {
    let created_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
    let quantity = 3;
    let line_subtotal = item.price() * quantity;
    let tax = line_subtotal.calculate_tax(TaxRate::from_bps(600));
    let shipping = Money::from_cents(1500);

    Order::new(
        NewOrder {
            id: Uuid::new_v4().to_string(),
            reference: format!("260314-092653-{}-{:03}", checkout_id, line),
            checkout_id: checkout_id.to_string(),
            buyer_id: buyer_id.to_string(),
            item_id: item.id.clone(),
            item_title: item.title.clone(),
            quantity,
            unit_price: item.price(),
            line_subtotal,
            tax,
            shipping,
            final_amount: line_subtotal + tax + shipping,
            currency: "USD".to_string(),
            payment_method: PaymentMethod::CashOnDelivery,
            shipping_address: sample_address(),
            notes: None,
            estimated_delivery: None,
        },
        created_at,
    )
    .expect("reconciling order")
}
