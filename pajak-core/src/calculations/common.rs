//! Common utility functions for tax calculations.
//!
//! No rounding happens here: amounts keep their full decimal precision until
//! they are presented.

use rust_decimal::Decimal;

use crate::error::CalculationError;

/// Returns the maximum of two decimal values.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use pajak_core::calculations::common::max;
///
/// assert_eq!(max(dec!(100.00), dec!(200.00)), dec!(200.00));
/// assert_eq!(max(dec!(-100.00), dec!(-200.00)), dec!(-100.00));
/// ```
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// Subtracts `b` from `a` and clamps the result at zero.
///
/// # Errors
///
/// [`CalculationError::InvalidInput`] when the subtraction overflows.
pub fn subtract_clamped(
    a: Decimal,
    b: Decimal,
    what: &str,
) -> Result<Decimal, CalculationError> {
    Ok(max(checked_sub(a, b, what)?, Decimal::ZERO))
}

pub fn checked_sub(
    a: Decimal,
    b: Decimal,
    what: &str,
) -> Result<Decimal, CalculationError> {
    a.checked_sub(b).ok_or_else(|| overflow(what))
}

pub fn checked_add(
    a: Decimal,
    b: Decimal,
    what: &str,
) -> Result<Decimal, CalculationError> {
    a.checked_add(b).ok_or_else(|| overflow(what))
}

pub fn checked_mul(
    a: Decimal,
    b: Decimal,
    what: &str,
) -> Result<Decimal, CalculationError> {
    a.checked_mul(b).ok_or_else(|| overflow(what))
}

fn overflow(what: &str) -> CalculationError {
    CalculationError::InvalidInput(format!("{what} is out of range"))
}
