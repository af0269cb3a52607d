//! # Pricing Repository
//!
//! Storage for the singleton pricing policy (`pricing_policy.id = 1`).
//!
//! Checkout calls [`PricingRepository::current`] exactly once and prices the
//! whole order from that snapshot. `None` means no administrator has
//! configured pricing yet; callers turn that into `ConfigMissing`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use folio_core::{Money, PaymentMethodToggles, PricingPolicy, PricingSettings, TaxRate};

#[derive(Debug, sqlx::FromRow)]
struct PricingRow {
    tax_rate_bps: i64,
    currency: String,
    shipping_fee_cents: i64,
    free_shipping_threshold_cents: Option<i64>,
    estimated_delivery_days: i64,
    allowed_countries: String,
    accepts_cash_on_delivery: bool,
    accepts_card: bool,
    accepts_bank_transfer: bool,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PricingRow> for PricingPolicy {
    type Error = DbError;

    fn try_from(row: PricingRow) -> Result<Self, Self::Error> {
        let tax_rate_bps = u32::try_from(row.tax_rate_bps)
            .map_err(|_| DbError::Internal(format!("tax_rate_bps {}", row.tax_rate_bps)))?;
        let estimated_delivery_days = u32::try_from(row.estimated_delivery_days).map_err(|_| {
            DbError::Internal(format!(
                "estimated_delivery_days {}",
                row.estimated_delivery_days
            ))
        })?;

        let settings = PricingSettings {
            tax_rate: TaxRate::from_bps(tax_rate_bps),
            currency: row.currency,
            shipping_fee: Money::from_cents(row.shipping_fee_cents),
            free_shipping_threshold: row.free_shipping_threshold_cents.map(Money::from_cents),
            estimated_delivery_days,
            allowed_countries: serde_json::from_str(&row.allowed_countries)?,
            payment_methods: PaymentMethodToggles {
                cash_on_delivery: row.accepts_cash_on_delivery,
                card: row.accepts_card,
                bank_transfer: row.accepts_bank_transfer,
            },
        };

        PricingPolicy::new(settings, row.updated_at)
            .map_err(|e| DbError::Internal(format!("stored pricing policy is invalid: {}", e)))
    }
}

/// Repository for the pricing policy row.
#[derive(Debug, Clone)]
pub struct PricingRepository {
    pool: SqlitePool,
}

impl PricingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PricingRepository { pool }
    }

    /// Returns the active policy snapshot, if one has been configured.
    pub async fn current(&self) -> DbResult<Option<PricingPolicy>> {
        let row = sqlx::query_as::<_, PricingRow>(
            r#"
            SELECT
                tax_rate_bps,
                currency,
                shipping_fee_cents,
                free_shipping_threshold_cents,
                estimated_delivery_days,
                allowed_countries,
                accepts_cash_on_delivery,
                accepts_card,
                accepts_bank_transfer,
                updated_at
            FROM pricing_policy
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let policy = row.map(PricingPolicy::try_from).transpose()?;
        debug!(configured = policy.is_some(), "Loaded pricing policy");
        Ok(policy)
    }

    /// Creates or replaces the policy row. Existing orders are unaffected.
    pub async fn save(&self, policy: &PricingPolicy) -> DbResult<()> {
        let settings = policy.settings();
        let allowed_countries = serde_json::to_string(&settings.allowed_countries)?;

        sqlx::query(
            r#"
            INSERT INTO pricing_policy (
                id, tax_rate_bps, currency, shipping_fee_cents,
                free_shipping_threshold_cents, estimated_delivery_days,
                allowed_countries, accepts_cash_on_delivery, accepts_card,
                accepts_bank_transfer, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (id) DO UPDATE SET
                tax_rate_bps = excluded.tax_rate_bps,
                currency = excluded.currency,
                shipping_fee_cents = excluded.shipping_fee_cents,
                free_shipping_threshold_cents = excluded.free_shipping_threshold_cents,
                estimated_delivery_days = excluded.estimated_delivery_days,
                allowed_countries = excluded.allowed_countries,
                accepts_cash_on_delivery = excluded.accepts_cash_on_delivery,
                accepts_card = excluded.accepts_card,
                accepts_bank_transfer = excluded.accepts_bank_transfer,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(settings.tax_rate.bps() as i64)
        .bind(&settings.currency)
        .bind(settings.shipping_fee.cents())
        .bind(settings.free_shipping_threshold.map(|m| m.cents()))
        .bind(settings.estimated_delivery_days as i64)
        .bind(allowed_countries)
        .bind(settings.payment_methods.cash_on_delivery)
        .bind(settings.payment_methods.card)
        .bind(settings.payment_methods.bank_transfer)
        .bind(policy.updated_at())
        .execute(&self.pool)
        .await?;

        info!(
            tax_rate_bps = settings.tax_rate.bps(),
            currency = %settings.currency,
            "Pricing policy saved"
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
