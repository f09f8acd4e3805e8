use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CalculationError;

/// The five financial amounts a calculation is computed from.
///
/// Every amount except `gross_income` may be omitted (or sent as `null`) and
/// is then treated as zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxInputs {
    pub gross_income: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub deductible_expenses: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub tax_deductions: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub tax_credits: Decimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub previous_tax_paid: Decimal,
}

impl TaxInputs {
    pub fn new(gross_income: Decimal) -> Self {
        Self {
            gross_income,
            ..Self::default()
        }
    }

    /// Parses inputs from a JSON object.
    ///
    /// Amounts may be JSON numbers or numeric strings. Anything else is an
    /// [`CalculationError::InvalidInput`]; it is never coerced to zero.
    pub fn from_json(json: &str) -> Result<Self, CalculationError> {
        serde_json::from_str(json)
            .map_err(|e| CalculationError::InvalidInput(format!("tax inputs: {e}")))
    }
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses a single amount typed in by a caller.
///
/// A blank value is the "missing field" case and yields zero; text that is
/// not a decimal number is rejected.
pub fn parse_amount(
    field: &str,
    raw: &str,
) -> Result<Decimal, CalculationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| CalculationError::InvalidInput(format!("{field}: '{raw}' is not a number")))
}

/// Amounts a caller wants to change on an existing calculation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputChanges {
    pub gross_income: Option<Decimal>,
    pub deductible_expenses: Option<Decimal>,
    pub tax_deductions: Option<Decimal>,
    pub tax_credits: Option<Decimal>,
    pub previous_tax_paid: Option<Decimal>,
}

impl InputChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns `current` with every supplied amount replaced.
    pub fn apply_to(
        &self,
        current: &TaxInputs,
    ) -> TaxInputs {
        TaxInputs {
            gross_income: self.gross_income.unwrap_or(current.gross_income),
            deductible_expenses: self
                .deductible_expenses
                .unwrap_or(current.deductible_expenses),
            tax_deductions: self.tax_deductions.unwrap_or(current.tax_deductions),
            tax_credits: self.tax_credits.unwrap_or(current.tax_credits),
            previous_tax_paid: self.previous_tax_paid.unwrap_or(current.previous_tax_paid),
        }
    }

    /// Whether applying these changes would alter any amount of `current`.
    pub fn alters(
        &self,
        current: &TaxInputs,
    ) -> bool {
        self.apply_to(current) != *current
    }
}
