//! Money arithmetic
//!
//! Every amount is a `Decimal` carried at two decimal places. Rounding is
//! half away from zero, the way printed hospital bills are rounded.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::HimsError;

/// Round to two decimal places and fix the scale at two
pub fn round(amount: Decimal) -> Decimal {
    let mut value = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);
    value
}

/// Largest amount a `NUMERIC(12,2)` column holds: 9,999,999,999.99
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// `quantity * unit_price`, rounded; fails when the product leaves the
/// storable range.
pub fn line_total(quantity: i32, unit_price: Decimal) -> Result<Decimal, HimsError> {
    let total = Decimal::from(quantity)
        .checked_mul(unit_price)
        .map(round)
        .ok_or_else(|| {
            HimsError::invalid(format!("{quantity} x {unit_price} is out of range"))
        })?;
    check_amount("Line total", total)?;
    Ok(total)
}

pub fn check_amount(field: &str, amount: Decimal) -> Result<(), HimsError> {
    if amount.abs() > MAX_AMOUNT {
        Err(HimsError::invalid(format!("{field} must not exceed {MAX_AMOUNT}")))
    } else {
        Ok(())
    }
}

pub fn check_non_negative(field: &str, amount: Decimal) -> Result<(), HimsError> {
    check_amount(field, amount)?;
    if amount.is_sign_negative() && !amount.is_zero() {
        Err(HimsError::invalid(format!("{field} must not be negative")))
    } else {
        Ok(())
    }
}

pub fn check_positive(field: &str, amount: Decimal) -> Result<(), HimsError> {
    check_amount(field, amount)?;
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(HimsError::invalid(format!("{field} must be greater than zero")))
    }
}

/// Discount applied to a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Discount {
    /// Fixed amount off the subtotal
    Flat(Decimal),
    /// Percentage of the subtotal, `0..=100`
    Percent(Decimal),
}

impl Discount {
    pub fn validate(&self) -> Result<(), HimsError> {
        match *self {
            Discount::Flat(amount) => check_non_negative("Flat discount", amount),
            Discount::Percent(pct) => {
                if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                    Err(HimsError::invalid("Discount percent must be between 0 and 100"))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Amount taken off `subtotal`.
    ///
    /// A flat discount larger than the subtotal is rejected, not clamped.
    pub fn amount_on(&self, subtotal: Decimal) -> Result<Decimal, HimsError> {
        self.validate()?;
        let amount = match *self {
            Discount::Flat(amount) => round(amount),
            Discount::Percent(pct) => round(subtotal * pct / Decimal::ONE_HUNDRED),
        };
        if amount > subtotal {
            return Err(HimsError::invalid(format!(
                "Discount {amount} exceeds subtotal {subtotal}"
            )));
        }
        Ok(amount)
    }
}

/// Discount amount for an optional discount
pub fn discount_amount(discount: Option<&Discount>, subtotal: Decimal) -> Result<Decimal, HimsError> {
    match discount {
        Some(d) => d.amount_on(subtotal),
        None => Ok(round(Decimal::ZERO)),
    }
}
