//! The tax computation engine.
//!
//! Turns a category and its five input amounts into a tax liability:
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Taxable income = gross income − deductible expenses (not floored) |
//! | 2    | Gross tax from the category's [`RateScheme`] |
//! | 3a   | Tax after deductions = max(0, gross tax − tax deductions) |
//! | 3b   | Calculated tax = max(0, tax after deductions − tax credits) |
//! | 4    | Final tax amount = max(0, calculated tax − previous tax paid) |
//! | 5    | Breakdown of method, parameters and echoed inputs |
//!
//! Progressive schemes apply the single rate of the bracket that contains the
//! taxable income to the *whole* taxable income. They are not stacked.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use pajak_core::calculations::TaxComputationEngine;
//! use pajak_core::{TaxCategory, TaxInputs};
//!
//! let inputs = TaxInputs {
//!     gross_income: dec!(70000000),
//!     deductible_expenses: dec!(10000000),
//!     tax_deductions: dec!(0),
//!     tax_credits: dec!(500000),
//!     previous_tax_paid: dec!(1000000),
//! };
//!
//! let result = TaxComputationEngine::new()
//!     .compute(&TaxCategory::Pph21, &inputs)
//!     .unwrap();
//!
//! assert_eq!(result.taxable_income, dec!(60000000));
//! assert_eq!(result.tax_rate, dec!(0.05));
//! assert_eq!(result.calculated_tax, dec!(2500000));
//! assert_eq!(result.final_tax_amount, dec!(1500000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::breakdown::CalculationBreakdown;
use crate::calculations::common::{checked_mul, checked_sub, subtract_clamped};
use crate::calculations::rate_scheme::{RateScheme, marginal_rate};
use crate::error::CalculationError;
use crate::models::{TaxCategory, TaxInputs};

/// Result of a computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxComputation {
    pub taxable_income: Decimal,

    /// Marginal, flat or annual installment rate that was applied.
    pub tax_rate: Decimal,

    /// Tax after deductions and credits, before prior payments.
    pub calculated_tax: Decimal,

    /// Amount still owed after prior payments.
    pub final_tax_amount: Decimal,

    pub breakdown: CalculationBreakdown,
}

/// Stateless calculator; every call depends only on its arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxComputationEngine;

impl TaxComputationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Computes the tax for `category` from `inputs`.
    ///
    /// Domain-level oddities such as negative amounts are computed through.
    ///
    /// # Errors
    ///
    /// [`CalculationError::InvalidInput`] if an intermediate amount leaves the
    /// representable decimal range.
    pub fn compute(
        &self,
        category: &TaxCategory,
        inputs: &TaxInputs,
    ) -> Result<TaxComputation, CalculationError> {
        let scheme = RateScheme::for_category(category);

        let taxable_income = self.taxable_income(inputs)?;

        let (tax_rate, gross_tax) = self.gross_tax(&scheme, taxable_income)?;

        let calculated_tax =
            self.apply_deductions(gross_tax, inputs.tax_deductions, inputs.tax_credits)?;

        let final_tax_amount = self.apply_prior_payments(calculated_tax, inputs.previous_tax_paid)?;

        let breakdown = CalculationBreakdown::new(
            category,
            &scheme,
            inputs,
            calculated_tax,
            final_tax_amount,
        )?;

        Ok(TaxComputation {
            taxable_income,
            tax_rate,
            calculated_tax,
            final_tax_amount,
            breakdown,
        })
    }

    /// Calculates taxable income. Not floored at zero.
    fn taxable_income(
        &self,
        inputs: &TaxInputs,
    ) -> Result<Decimal, CalculationError> {
        checked_sub(
            inputs.gross_income,
            inputs.deductible_expenses,
            "taxable income",
        )
    }

    /// Returns the applied rate and the gross tax before any offsets.
    fn gross_tax(
        &self,
        scheme: &RateScheme,
        taxable_income: Decimal,
    ) -> Result<(Decimal, Decimal), CalculationError> {
        match *scheme {
            RateScheme::Progressive { brackets } => {
                let rate = marginal_rate(brackets, taxable_income);
                Ok((rate, checked_mul(taxable_income, rate, "gross tax")?))
            }
            RateScheme::Flat { rate } | RateScheme::Default { rate } => {
                Ok((rate, checked_mul(taxable_income, rate, "gross tax")?))
            }
            RateScheme::Installment {
                annual_rate,
                periods,
            } => {
                let annual = checked_mul(taxable_income, annual_rate, "gross tax")?;
                let installment = annual
                    .checked_div(Decimal::from(periods))
                    .ok_or_else(|| {
                        CalculationError::InvalidInput("installment tax is out of range".to_string())
                    })?;
                Ok((annual_rate, installment))
            }
        }
    }

    /// Applies tax deductions, then tax credits, clamping each at zero.
    fn apply_deductions(
        &self,
        gross_tax: Decimal,
        tax_deductions: Decimal,
        tax_credits: Decimal,
    ) -> Result<Decimal, CalculationError> {
        let after_deductions = subtract_clamped(gross_tax, tax_deductions, "tax after deductions")?;
        subtract_clamped(after_deductions, tax_credits, "tax after credits")
    }

    /// Offsets tax already paid for the period.
    fn apply_prior_payments(
        &self,
        calculated_tax: Decimal,
        previous_tax_paid: Decimal,
    ) -> Result<Decimal, CalculationError> {
        subtract_clamped(calculated_tax, previous_tax_paid, "final tax amount")
    }
}
