//! # Order Allocation
//!
//! Prices a whole checkout and splits the aggregate tax and shipping across
//! its line items in proportion to each line's share of the subtotal.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. line_i   = unit_price_i × quantity_i                                │
//! │     subtotal = Σ line_i                                                 │
//! │                                                                         │
//! │  2. tax      = policy.tax(subtotal)          (one rounding, half up)    │
//! │     shipping = policy.shipping_fee(subtotal)                            │
//! │                                                                         │
//! │  3. for every line except the last:                                     │
//! │        tax_i      = floor(tax      × line_i / subtotal)                 │
//! │        shipping_i = floor(shipping × line_i / subtotal)                 │
//! │                                                                         │
//! │  4. last line takes the residual:                                       │
//! │        tax_n      = tax      − Σ tax_i                                  │
//! │        shipping_n = shipping − Σ shipping_i                             │
//! │                                                                         │
//! │  ⇒ Σ final_i == subtotal + tax + shipping, exactly                      │
//! │  ⇒ every share ≥ 0 (floors never overshoot the aggregate)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A zero subtotal (all free items) makes every proportional share zero; the
//! residual rule then puts the whole aggregate on the last line.

use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::PricingPolicy;
use crate::validation::{validate_price_cents, validate_quantity};

// =============================================================================
// Input / Output Types
// =============================================================================

/// A line item with its price resolved from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub item_id: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price: Money,
}

/// A priced line with its allocated charges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedLine {
    pub item_id: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub final_amount: Money,
}

/// Checkout-level totals, returned to the buyer as the order summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping_fee: Money,
    pub final_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub totals: OrderTotals,
    pub lines: Vec<AllocatedLine>,
}

// =============================================================================
// Allocator
// =============================================================================

/// Prices `lines` against `policy` and allocates tax and shipping per line.
///
/// ## Errors
/// - empty `lines`
/// - a quantity outside 1..=999 or a negative unit price
pub fn allocate(lines: &[PricedLine], policy: &PricingPolicy) -> CoreResult<Allocation> {
    let Some((last, leading)) = lines.split_last() else {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        }
        .into());
    };

    for line in lines {
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price.cents())?;
    }

    let subtotal: Money = lines
        .iter()
        .map(|line| line.unit_price.multiply_quantity(line.quantity))
        .sum();
    let tax = policy.tax(subtotal);
    let shipping = policy.shipping_fee(subtotal);

    let mut allocated = Vec::with_capacity(lines.len());
    let mut tax_given = Money::zero();
    let mut shipping_given = Money::zero();

    for line in leading {
        let line_subtotal = line.unit_price.multiply_quantity(line.quantity);
        let line_tax = tax.proportional_share(line_subtotal, subtotal);
        let line_shipping = shipping.proportional_share(line_subtotal, subtotal);
        tax_given += line_tax;
        shipping_given += line_shipping;
        allocated.push(allocated_line(line, line_subtotal, line_tax, line_shipping));
    }

    let last_subtotal = last.unit_price.multiply_quantity(last.quantity);
    allocated.push(allocated_line(
        last,
        last_subtotal,
        tax - tax_given,
        shipping - shipping_given,
    ));

    Ok(Allocation {
        totals: OrderTotals {
            subtotal,
            tax,
            shipping_fee: shipping,
            final_total: subtotal + tax + shipping,
        },
        lines: allocated,
    })
}

fn allocated_line(
    line: &PricedLine,
    line_subtotal: Money,
    tax: Money,
    shipping: Money,
) -> AllocatedLine {
    AllocatedLine {
        item_id: line.item_id.clone(),
        title: line.title.clone(),
        quantity: line.quantity,
        unit_price: line.unit_price,
        line_subtotal,
        tax,
        shipping,
        final_amount: line_subtotal + tax + shipping,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
