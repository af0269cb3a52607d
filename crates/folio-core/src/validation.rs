//! # Validation Module
//!
//! Input validation for checkout and lifecycle requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum Json)                                   │
//! │  └── Shape / type errors → 400                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Quantities, cart size, ids                                        │
//! │  └── Address, reasons, tracking numbers                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  └── UNIQUE / FOREIGN KEY constraints                                  │
//! │                                                                         │
//! │  Everything here runs before any stock is reserved.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use folio_core::validation::{validate_quantity, validate_country_code};
//!
//! assert!(validate_quantity(3).is_ok());
//! assert!(validate_quantity(0).is_err());
//! assert!(validate_country_code("shippingAddress.country", "GB").is_ok());
//! ```

use crate::error::ValidationError;
use crate::types::{ShippingAddress, TaxRate};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_ADDRESS_FIELD_LEN: usize = 200;
const MAX_REASON_LEN: usize = 500;
const MAX_NOTES_LEN: usize = 1000;
const MAX_TRACKING_LEN: usize = 64;
const MAX_TRANSACTION_ID_LEN: usize = 128;

// =============================================================================
// String Validators
// =============================================================================

/// Non-blank after trimming, at most `max` characters.
fn require_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

fn optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(value) if value.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty, at most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ```rust
/// use folio_core::validation::validate_sku;
///
/// assert!(validate_sku("BOOK-ATLAS").is_ok());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    require_text("sku", sku, 50)?;

    if !sku
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

pub fn validate_title(title: &str) -> ValidationResult<()> {
    require_text("title", title, MAX_NAME_LEN)
}

/// Validates an ISO-4217 currency code (three upper-case ASCII letters).
pub fn validate_currency_code(code: &str) -> ValidationResult<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter ISO-4217 code".to_string(),
        });
    }
    Ok(())
}

/// Validates an ISO-3166 alpha-2 country code (case-insensitive).
pub fn validate_country_code(field: &str, code: &str) -> ValidationResult<()> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a two-letter ISO-3166 code".to_string(),
        });
    }
    Ok(())
}

/// Validates a shipping address.
///
/// ## Rules
/// - `fullName`, `line1`, `city`, `postalCode`, `country` are required
/// - `country` is a two-letter code
/// - free-text fields are bounded
pub fn validate_shipping_address(address: &ShippingAddress) -> ValidationResult<()> {
    require_text("shippingAddress.fullName", &address.full_name, MAX_NAME_LEN)?;
    require_text("shippingAddress.line1", &address.line1, MAX_ADDRESS_FIELD_LEN)?;
    optional_text(
        "shippingAddress.line2",
        address.line2.as_deref(),
        MAX_ADDRESS_FIELD_LEN,
    )?;
    require_text("shippingAddress.city", &address.city, MAX_ADDRESS_FIELD_LEN)?;
    optional_text(
        "shippingAddress.region",
        address.region.as_deref(),
        MAX_ADDRESS_FIELD_LEN,
    )?;
    require_text("shippingAddress.postalCode", &address.postal_code, 20)?;
    validate_country_code("shippingAddress.country", &address.country)?;
    optional_text("shippingAddress.phone", address.phone.as_deref(), 32)?;
    Ok(())
}

pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    optional_text("notes", notes, MAX_NOTES_LEN)
}

/// A refund must say why.
pub fn validate_refund_reason(reason: &str) -> ValidationResult<()> {
    require_text("reason", reason, MAX_REASON_LEN)
}

pub fn validate_cancel_reason(reason: Option<&str>) -> ValidationResult<()> {
    optional_text("reason", reason, MAX_REASON_LEN)
}

pub fn validate_tracking_number(tracking: Option<&str>) -> ValidationResult<()> {
    match tracking {
        Some(tracking) => require_text("trackingNumber", tracking, MAX_TRACKING_LEN),
        None => Ok(()),
    }
}

pub fn validate_transaction_id(transaction_id: &str) -> ValidationResult<()> {
    require_text("transactionId", transaction_id, MAX_TRANSACTION_ID_LEN)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free ebooks).
///
/// ```rust
/// use folio_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(2000).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    validate_non_negative_cents("price", cents)
}

pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a tax rate: 0 to 10000 bps (0% to 100%).
pub fn validate_tax_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > TaxRate::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "taxRate".to_string(),
            min: 0,
            max: TaxRate::MAX_BPS as i64,
        });
    }
    Ok(())
}

/// Validates the number of lines in a checkout request.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use folio_core::validation::validate_uuid;
///
/// assert!(validate_uuid("itemId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("itemId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            line1: "12 St James's Square".to_string(),
            line2: None,
            city: "London".to_string(),
            region: None,
            postal_code: "SW1Y 4JH".to_string(),
            country: "GB".to_string(),
            phone: Some("+44 20 7946 0000".to_string()),
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_CART_ITEMS).is_ok());
        assert!(matches!(
            validate_line_count(0),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_line_count(MAX_CART_ITEMS + 1).is_err());
    }

    #[test]
    fn test_validate_shipping_address() {
        assert!(validate_shipping_address(&address()).is_ok());

        let mut missing_city = address();
        missing_city.city = "   ".to_string();
        let err = validate_shipping_address(&missing_city).unwrap_err();
        assert_eq!(err.to_string(), "shippingAddress.city is required");

        let mut bad_country = address();
        bad_country.country = "GBR".to_string();
        assert!(validate_shipping_address(&bad_country).is_err());
    }

    #[test]
    fn test_validate_refund_reason() {
        assert!(validate_refund_reason("damaged in transit").is_ok());
        assert!(validate_refund_reason("  ").is_err());
        assert!(validate_refund_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_validate_currency_code() {
        assert!(validate_currency_code("USD").is_ok());
        assert!(validate_currency_code("usd").is_err());
        assert!(validate_currency_code("US").is_err());
    }

    #[test]
    fn test_validate_tax_rate() {
        assert!(validate_tax_rate(TaxRate::from_bps(0)).is_ok());
        assert!(validate_tax_rate(TaxRate::from_bps(10_000)).is_ok());
        assert!(validate_tax_rate(TaxRate::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_validate_tracking_number() {
        assert!(validate_tracking_number(None).is_ok());
        assert!(validate_tracking_number(Some("1Z999AA10123456784")).is_ok());
        assert!(validate_tracking_number(Some("")).is_err());
    }
}
