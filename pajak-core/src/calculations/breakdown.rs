//! The auditable record of how a calculation was derived.
//!
//! A breakdown embeds the exact rate or bracket table that was applied, so a
//! stored calculation stays explainable after the live rate tables change.
//! It is stored as JSON:
//!
//! ```json
//! {
//!   "method": "progressive",
//!   "brackets": [{"max": "60000000", "rate": "0.05"}, {"max": null, "rate": "0.35"}],
//!   "description": "PPH_21: progressive rate, ...",
//!   "grossIncome": "70000000",
//!   "deductibleExpenses": "10000000",
//!   "taxDeductions": "0",
//!   "taxCredits": "500000",
//!   "previousTaxPaid": "1000000",
//!   "calculatedTaxBeforeDeductions": "3000000",
//!   "finalTaxAmount": "1500000"
//! }
//! ```
//!
//! Unknown fields are ignored on read.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::{checked_add, checked_sub, subtract_clamped};
use crate::calculations::rate_scheme::{RateScheme, SchemeKind, TaxBracket, marginal_rate};
use crate::error::CalculationError;
use crate::models::{TaxCalculation, TaxCategory, TaxInputs};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BreakdownError {
    #[error("failed to serialize breakdown: {0}")]
    Serialize(String),

    #[error("failed to deserialize breakdown: {0}")]
    Deserialize(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationBreakdown {
    pub method: SchemeKind,

    /// Flat, installment (annual) or default rate. Absent for progressive
    /// schemes, which record their brackets instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brackets: Option<Vec<TaxBracket>>,

    /// Number of installments the annual rate is divided into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,

    pub description: String,

    pub gross_income: Decimal,
    pub deductible_expenses: Decimal,
    pub tax_deductions: Decimal,
    pub tax_credits: Decimal,
    pub previous_tax_paid: Decimal,

    /// Tax after deductions and credits with both added back.
    pub calculated_tax_before_deductions: Decimal,
    pub final_tax_amount: Decimal,
}

/// Amounts re-derived from a stored breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RederivedAmounts {
    pub calculated_tax: Decimal,
    pub final_tax_amount: Decimal,
}

/// A stored value that disagrees with what its breakdown implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownMismatch {
    pub field: &'static str,
    pub stored: Decimal,
    pub expected: Decimal,
}

impl CalculationBreakdown {
    /// Builds the breakdown for a finished computation.
    pub(crate) fn new(
        category: &TaxCategory,
        scheme: &RateScheme,
        inputs: &TaxInputs,
        calculated_tax: Decimal,
        final_tax_amount: Decimal,
    ) -> Result<Self, CalculationError> {
        let (rate, brackets, installments) = match *scheme {
            RateScheme::Progressive { brackets } => (None, Some(brackets.to_vec()), None),
            RateScheme::Flat { rate } | RateScheme::Default { rate } => (Some(rate), None, None),
            RateScheme::Installment {
                annual_rate,
                periods,
            } => (Some(annual_rate), None, Some(periods)),
        };

        let added_back = checked_add(
            calculated_tax,
            inputs.tax_deductions,
            "tax before deductions",
        )?;
        let calculated_tax_before_deductions =
            checked_add(added_back, inputs.tax_credits, "tax before deductions")?;

        Ok(Self {
            method: scheme.kind(),
            rate,
            brackets,
            installments,
            description: scheme.describe(category),
            gross_income: inputs.gross_income,
            deductible_expenses: inputs.deductible_expenses,
            tax_deductions: inputs.tax_deductions,
            tax_credits: inputs.tax_credits,
            previous_tax_paid: inputs.previous_tax_paid,
            calculated_tax_before_deductions,
            final_tax_amount,
        })
    }

    pub fn to_json(&self) -> Result<String, BreakdownError> {
        serde_json::to_string(self).map_err(|e| BreakdownError::Serialize(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, BreakdownError> {
        serde_json::from_str(json).map_err(|e| BreakdownError::Deserialize(e.to_string()))
    }

    /// The input amounts echoed into this breakdown.
    pub fn inputs(&self) -> TaxInputs {
        TaxInputs {
            gross_income: self.gross_income,
            deductible_expenses: self.deductible_expenses,
            tax_deductions: self.tax_deductions,
            tax_credits: self.tax_credits,
            previous_tax_paid: self.previous_tax_paid,
        }
    }

    /// Rate this breakdown's own table applies to `taxable_income`. `None`
    /// when the breakdown records neither a rate nor brackets.
    pub fn applied_rate(
        &self,
        taxable_income: Decimal,
    ) -> Option<Decimal> {
        match &self.brackets {
            Some(brackets) => Some(marginal_rate(brackets, taxable_income)),
            None => self.rate,
        }
    }

    /// Replays the deduction, credit and prior-payment offsets against
    /// `calculated_tax_before_deductions`.
    pub fn rederive(&self) -> Result<RederivedAmounts, CalculationError> {
        let after_deductions = subtract_clamped(
            self.calculated_tax_before_deductions,
            self.tax_deductions,
            "tax after deductions",
        )?;
        let calculated_tax =
            subtract_clamped(after_deductions, self.tax_credits, "tax after credits")?;
        let final_tax_amount =
            subtract_clamped(calculated_tax, self.previous_tax_paid, "final tax amount")?;

        Ok(RederivedAmounts {
            calculated_tax,
            final_tax_amount,
        })
    }

    /// Compares a stored record against this breakdown and lists every amount
    /// that does not line up. An empty list means the record is consistent.
    pub fn audit(
        &self,
        record: &TaxCalculation,
    ) -> Result<Vec<BreakdownMismatch>, CalculationError> {
        let derived = self.rederive()?;
        let echoed = self.inputs();
        let stored = record.inputs();
        let taxable_income = checked_sub(
            echoed.gross_income,
            echoed.deductible_expenses,
            "taxable income",
        )?;

        let mut checks = vec![
            ("gross_income", stored.gross_income, echoed.gross_income),
            (
                "deductible_expenses",
                stored.deductible_expenses,
                echoed.deductible_expenses,
            ),
            ("tax_deductions", stored.tax_deductions, echoed.tax_deductions),
            ("tax_credits", stored.tax_credits, echoed.tax_credits),
            (
                "previous_tax_paid",
                stored.previous_tax_paid,
                echoed.previous_tax_paid,
            ),
            ("taxable_income", record.taxable_income, taxable_income),
            (
                "calculated_tax",
                record.calculated_tax,
                derived.calculated_tax,
            ),
            (
                "final_tax_amount",
                record.final_tax_amount,
                derived.final_tax_amount,
            ),
            (
                "breakdown.final_tax_amount",
                self.final_tax_amount,
                derived.final_tax_amount,
            ),
        ];
        if let Some(rate) = self.applied_rate(taxable_income) {
            checks.insert(6, ("tax_rate", record.tax_rate, rate));
        }

        Ok(checks
            .into_iter()
            .filter(|(_, stored, expected)| stored != expected)
            .map(|(field, stored, expected)| BreakdownMismatch {
                field,
                stored,
                expected,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use chrono::Utc;

    use super::*;
    use crate::calculations::TaxComputationEngine;
    use crate::models::{CalculationType, NewTaxCalculation};
    use crate::workflow::CalculationLifecycle;

    fn breakdown_for(
        category: &str,
        inputs: TaxInputs,
    ) -> CalculationBreakdown {
        TaxComputationEngine::new()
            .compute(&TaxCategory::parse(category), &inputs)
            .unwrap()
            .breakdown
    }

    fn sample_inputs() -> TaxInputs {
        TaxInputs {
            gross_income: dec!(70000000),
            deductible_expenses: dec!(10000000),
            tax_deductions: dec!(250000),
            tax_credits: dec!(500000),
            previous_tax_paid: dec!(1000000),
        }
    }

    // =========================================================================
    // round-trip tests
    // =========================================================================

    #[test]
    fn round_trips_each_method_kind() {
        for category in ["PPH_21", "PPN", "PPH_25", "XYZ"] {
            let breakdown = breakdown_for(category, sample_inputs());

            let json = breakdown.to_json().unwrap();
            let restored = CalculationBreakdown::from_json(&json).unwrap();

            assert_eq!(restored, breakdown, "{category}");
        }
    }

    #[test]
    fn round_trip_keeps_full_precision() {
        let inputs = TaxInputs {
            gross_income: dec!(1234567.891234),
            ..TaxInputs::default()
        };
        let breakdown = breakdown_for("PPH_25", inputs);

        let restored = CalculationBreakdown::from_json(&breakdown.to_json().unwrap()).unwrap();

        assert_eq!(
            restored.calculated_tax_before_deductions,
            breakdown.calculated_tax_before_deductions
        );
    }

    #[test]
    fn ignores_unknown_fields() {
        let json = r#"{
            "method": "flat",
            "rate": "0.11",
            "description": "PPN: flat rate of 11% on taxable income",
            "grossIncome": "100000000",
            "deductibleExpenses": "0",
            "taxDeductions": "0",
            "taxCredits": "0",
            "previousTaxPaid": "0",
            "calculatedTaxBeforeDeductions": "11000000",
            "finalTaxAmount": "11000000",
            "roundingMode": "none",
            "legacyRateTable": {"version": 3}
        }"#;

        let breakdown = CalculationBreakdown::from_json(json).unwrap();

        assert_eq!(breakdown.method, SchemeKind::Flat);
        assert_eq!(breakdown.rate, Some(dec!(0.11)));
        assert_eq!(breakdown.brackets, None);
    }

    #[test]
    fn reads_historical_bracket_table_that_differs_from_live_one() {
        let json = r#"{
            "method": "progressive",
            "brackets": [{"max": "50000000", "rate": "0.05"}, {"max": null, "rate": "0.30"}],
            "description": "PPH_21 under an older schedule",
            "grossIncome": "80000000",
            "deductibleExpenses": "0",
            "taxDeductions": "0",
            "taxCredits": "0",
            "previousTaxPaid": "0",
            "calculatedTaxBeforeDeductions": "24000000",
            "finalTaxAmount": "24000000"
        }"#;

        let breakdown = CalculationBreakdown::from_json(json).unwrap();

        let brackets = breakdown.brackets.unwrap();
        assert_eq!(brackets.len(), 2);
        assert_eq!(brackets[0].max_income, Some(dec!(50000000)));
        assert_eq!(brackets[1].tax_rate, dec!(0.30));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = CalculationBreakdown::from_json("{\"method\": 7}");

        assert!(matches!(result, Err(BreakdownError::Deserialize(_))));
    }

    // =========================================================================
    // shape tests
    // =========================================================================

    #[test]
    fn progressive_records_brackets_not_rate() {
        let breakdown = breakdown_for("PAJAK_KENDARAAN", sample_inputs());

        assert_eq!(breakdown.method, SchemeKind::Progressive);
        assert_eq!(breakdown.rate, None);
        assert_eq!(breakdown.brackets.map(|b| b.len()), Some(4));
    }

    #[test]
    fn installment_records_annual_rate_and_periods() {
        let breakdown = breakdown_for("PPH_25", sample_inputs());

        assert_eq!(breakdown.method, SchemeKind::Installment);
        assert_eq!(breakdown.rate, Some(dec!(0.25)));
        assert_eq!(breakdown.installments, Some(12));
    }

    #[test]
    fn serialized_keys_are_camel_case() {
        let json = breakdown_for("PPN", sample_inputs()).to_json().unwrap();

        assert!(json.contains("\"calculatedTaxBeforeDeductions\""));
        assert!(json.contains("\"previousTaxPaid\""));
        assert!(!json.contains("\"brackets\""));
    }

    // =========================================================================
    // rederive / audit tests
    // =========================================================================

    #[test]
    fn rederive_reproduces_engine_result() {
        let inputs = sample_inputs();
        let computation = TaxComputationEngine::new()
            .compute(&TaxCategory::Pph21, &inputs)
            .unwrap();

        let derived = computation.breakdown.rederive().unwrap();

        assert_eq!(derived.calculated_tax, computation.calculated_tax);
        assert_eq!(derived.final_tax_amount, computation.final_tax_amount);
    }

    #[test]
    fn rederive_reproduces_clamped_result() {
        let inputs = TaxInputs {
            gross_income: dec!(1000000),
            tax_credits: dec!(900000),
            previous_tax_paid: dec!(50),
            ..TaxInputs::default()
        };
        let computation = TaxComputationEngine::new()
            .compute(&TaxCategory::Ppn, &inputs)
            .unwrap();

        let derived = computation.breakdown.rederive().unwrap();

        assert_eq!(computation.calculated_tax, dec!(0));
        assert_eq!(derived.calculated_tax, dec!(0));
        assert_eq!(derived.final_tax_amount, dec!(0));
    }

    #[test]
    fn audit_replays_rate_from_recorded_brackets() {
        let mut record = CalculationLifecycle::default()
            .create(
                NewTaxCalculation {
                    user_id: "wp-001".to_string(),
                    tax_category: TaxCategory::Pph21,
                    calculation_type: CalculationType::Annual,
                    period: "2024".to_string(),
                    year: 2024,
                    inputs: sample_inputs(),
                    notes: None,
                },
                Utc::now(),
            )
            .unwrap();
        let breakdown = record.calculation_data.clone().unwrap();
        assert!(breakdown.audit(&record).unwrap().is_empty());

        record.tax_rate = dec!(0.35);
        record.taxable_income = dec!(1);

        let mismatches = breakdown.audit(&record).unwrap();

        assert_eq!(
            mismatches,
            vec![
                BreakdownMismatch {
                    field: "taxable_income",
                    stored: dec!(1),
                    expected: dec!(60000000),
                },
                BreakdownMismatch {
                    field: "tax_rate",
                    stored: dec!(0.35),
                    expected: dec!(0.05),
                },
            ]
        );
    }

    #[test]
    fn applied_rate_uses_flat_or_installment_rate() {
        let flat = breakdown_for("PPN", sample_inputs());
        let installment = breakdown_for("PPH_25", sample_inputs());

        assert_eq!(flat.applied_rate(dec!(1)), Some(dec!(0.11)));
        assert_eq!(installment.applied_rate(dec!(1)), Some(dec!(0.25)));
    }
}
