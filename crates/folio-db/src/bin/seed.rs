//! # Seed Data Generator
//!
//! Populates a development database with a pricing policy and a small
//! catalogue of books, posters and ebooks.
//!
//! ## Usage
//! ```bash
//! # Seed ./folio_dev.db
//! cargo run -p folio-db --bin seed
//!
//! # Specify database path
//! cargo run -p folio-db --bin seed -- --db ./data/folio.db
//! ```
//!
//! ## Seeded Pricing Policy
//! - Tax: 6%
//! - Shipping: 15.00 USD, free from 100.00 USD
//! - Ships to: US, CA
//! - Cash on delivery and card enabled

use chrono::Utc;
use std::env;

use folio_core::{Item, Money, PaymentMethodToggles, PricingPolicy, PricingSettings, TaxRate};
use folio_db::{generate_item_id, Database, DbConfig};

/// (SKU prefix, titles, base price in cents)
const CATALOGUE: &[(&str, &[&str], i64)] = &[
    (
        "BOOK",
        &[
            "The Cartographer's Atlas",
            "A Field Guide to Clouds",
            "Letters from the Lighthouse",
            "Small Gods of the River",
            "The Patient Gardener",
        ],
        2000,
    ),
    (
        "POSTER",
        &["Night Train Print", "Botanical Ferns Print", "Old Harbour Map"],
        1200,
    ),
    (
        "EBOOK",
        &["Notes on Quiet Machines", "The Winter Ledger"],
        899,
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./folio_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Folio Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./folio_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Folio Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Pricing policy
    if db.pricing().current().await?.is_some() {
        println!("⚠ Pricing policy already configured, leaving it alone");
    } else {
        let policy = PricingPolicy::new(
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
        )?;
        db.pricing().save(&policy).await?;
        println!("✓ Pricing policy saved");
    }

    // Catalogue (idempotent by SKU)
    println!();
    println!("Generating items...");

    let mut generated = 0;
    let mut skipped = 0;
    for (prefix, titles, base_price) in CATALOGUE {
        for (index, title) in titles.iter().enumerate() {
            let item = generate_item(prefix, title, *base_price, index);
            if let Some(existing) = db.items().get_by_sku(&item.sku).await? {
                println!("  {:<10} already present (id {})", existing.sku, existing.id);
                skipped += 1;
                continue;
            }
            if let Err(e) = db.items().insert(&item).await {
                eprintln!("Failed to insert {}: {}", item.sku, e);
                continue;
            }
            println!(
                "  {:<10} {:<32} {:>12}  stock {:>3}  id {}",
                item.sku,
                item.title,
                item.price().format_in("USD"),
                item.stock,
                item.id
            );
            generated += 1;
        }
    }

    if skipped > 0 {
        println!();
        println!("⚠ Skipped {} items that were already seeded", skipped);
    }
    println!();
    println!("✓ Generated {} items", generated);
    println!("✓ Catalogue has {} active items", db.items().count().await?);
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one active item with a deterministic price and stock.
fn generate_item(prefix: &str, title: &str, base_price: i64, index: usize) -> Item {
    let now = Utc::now();

    Item {
        id: generate_item_id(),
        sku: format!("{}-{:03}", prefix, index + 1),
        title: title.to_string(),
        price_cents: base_price + (index as i64) * 150,
        stock: 5 + ((index * 7) % 20) as i64,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
