//! # Pricing Policy
//!
//! The storefront-wide pricing settings, as an immutable snapshot.
//!
//! ## Snapshot Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Admin updates settings ──► pricing_policy row (id = 1)                │
//! │                                      │                                  │
//! │                  checkout reads ONCE │ PricingRepository::current()     │
//! │                                      ▼                                  │
//! │                          PricingPolicy (this type)                      │
//! │                                      │                                  │
//! │                   passed by reference into allocation::allocate         │
//! │                                                                         │
//! │  Later admin edits only affect later checkouts.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Worked Example
//! ```rust
//! use folio_core::money::Money;
//! use folio_core::pricing::{PricingPolicy, PricingSettings};
//! use folio_core::types::TaxRate;
//!
//! let policy = PricingPolicy::new(PricingSettings {
//!     tax_rate: TaxRate::from_bps(600),
//!     shipping_fee: Money::from_cents(1500),
//!     free_shipping_threshold: Some(Money::from_cents(10000)),
//!     ..PricingSettings::default()
//! }, chrono::Utc::now()).unwrap();
//!
//! let subtotal = Money::from_cents(6000);
//! assert_eq!(policy.tax(subtotal).cents(), 360);
//! assert_eq!(policy.shipping_fee(subtotal).cents(), 1500);
//! assert_eq!(policy.total(subtotal, true).cents(), 7860);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, PaymentMethodToggles, TaxRate};
use crate::validation::{
    validate_country_code, validate_currency_code, validate_non_negative_cents, validate_tax_rate,
};

/// Longest delivery estimate a policy may declare.
const MAX_DELIVERY_DAYS: u32 = 365;

// =============================================================================
// Settings (unvalidated input)
// =============================================================================

/// Raw pricing settings, as entered by an administrator or read from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingSettings {
    pub tax_rate: TaxRate,
    pub currency: String,
    pub shipping_fee: Money,
    pub free_shipping_threshold: Option<Money>,
    pub estimated_delivery_days: u32,
    /// ISO-3166 alpha-2 codes. Empty means ship anywhere.
    pub allowed_countries: Vec<String>,
    pub payment_methods: PaymentMethodToggles,
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            tax_rate: TaxRate::zero(),
            currency: "USD".to_string(),
            shipping_fee: Money::zero(),
            free_shipping_threshold: None,
            estimated_delivery_days: 5,
            allowed_countries: Vec::new(),
            payment_methods: PaymentMethodToggles::default(),
        }
    }
}

// =============================================================================
// Pricing Policy
// =============================================================================

/// A validated pricing snapshot. Only [`PricingPolicy::new`] builds one.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingPolicy {
    #[serde(flatten)]
    settings: PricingSettings,
    #[ts(as = "String")]
    updated_at: DateTime<Utc>,
}

impl PricingPolicy {
    /// Validates every field and normalises country codes to upper case.
    pub fn new(
        mut settings: PricingSettings,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_tax_rate(settings.tax_rate)?;
        validate_currency_code(&settings.currency)?;
        validate_non_negative_cents("shippingFee", settings.shipping_fee.cents())?;
        if let Some(threshold) = settings.free_shipping_threshold {
            validate_non_negative_cents("freeShippingThreshold", threshold.cents())?;
        }
        if settings.estimated_delivery_days > MAX_DELIVERY_DAYS {
            return Err(ValidationError::OutOfRange {
                field: "estimatedDeliveryDays".to_string(),
                min: 0,
                max: MAX_DELIVERY_DAYS as i64,
            });
        }
        for country in &mut settings.allowed_countries {
            validate_country_code("allowedCountries", country)?;
            *country = country.trim().to_ascii_uppercase();
        }

        Ok(PricingPolicy {
            settings,
            updated_at,
        })
    }

    /// Turns "no policy row" into [`CoreError::ConfigMissing`].
    pub fn require(policy: Option<PricingPolicy>) -> CoreResult<PricingPolicy> {
        policy.ok_or(CoreError::ConfigMissing)
    }

    // -------------------------------------------------------------------------
    // Pure pricing functions
    // -------------------------------------------------------------------------

    /// Tax on `amount`, rounded half up to the cent.
    pub fn tax(&self, amount: Money) -> Money {
        amount.calculate_tax(self.settings.tax_rate)
    }

    /// Flat fee, waived once `order_subtotal` reaches the free-shipping threshold.
    pub fn shipping_fee(&self, order_subtotal: Money) -> Money {
        match self.settings.free_shipping_threshold {
            Some(threshold) if order_subtotal >= threshold => Money::zero(),
            _ => self.settings.shipping_fee,
        }
    }

    pub fn total(&self, subtotal: Money, include_shipping: bool) -> Money {
        let shipping = if include_shipping {
            self.shipping_fee(subtotal)
        } else {
            Money::zero()
        };
        subtotal + self.tax(subtotal) + shipping
    }

    pub fn accepts(&self, method: PaymentMethod) -> bool {
        self.settings.payment_methods.is_enabled(method)
    }

    /// Case-insensitive. An empty allow-list ships anywhere.
    pub fn ships_to(&self, country: &str) -> bool {
        let countries = &self.settings.allowed_countries;
        countries.is_empty()
            || countries
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(country.trim()))
    }

    pub fn estimated_delivery(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + Duration::days(self.settings.estimated_delivery_days as i64)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn settings(&self) -> &PricingSettings {
        &self.settings
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.settings.tax_rate
    }

    pub fn currency(&self) -> &str {
        &self.settings.currency
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
