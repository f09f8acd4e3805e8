use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::CalculationBreakdown;
use crate::models::{CalculationStatus, CalculationType, InputChanges, TaxCategory, TaxInputs};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculation {
    pub id: i64,
    pub user_id: String,

    pub tax_category: TaxCategory,
    pub calculation_type: CalculationType,
    pub period: String,
    pub year: i32,

    // Caller-provided amounts
    pub gross_income: Decimal,
    pub deductible_expenses: Decimal,
    pub tax_deductions: Decimal,
    pub tax_credits: Decimal,
    pub previous_tax_paid: Decimal,

    // Engine output, never supplied by a caller
    pub taxable_income: Decimal,
    pub tax_rate: Decimal,
    pub calculated_tax: Decimal,
    pub final_tax_amount: Decimal,

    /// Absent only on drafts that have never been computed.
    pub calculation_data: Option<CalculationBreakdown>,

    pub status: CalculationStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaxCalculation {
    pub fn inputs(&self) -> TaxInputs {
        TaxInputs {
            gross_income: self.gross_income,
            deductible_expenses: self.deductible_expenses,
            tax_deductions: self.tax_deductions,
            tax_credits: self.tax_credits,
            previous_tax_paid: self.previous_tax_paid,
        }
    }

    pub(crate) fn set_inputs(
        &mut self,
        inputs: &TaxInputs,
    ) {
        self.gross_income = inputs.gross_income;
        self.deductible_expenses = inputs.deductible_expenses;
        self.tax_deductions = inputs.tax_deductions;
        self.tax_credits = inputs.tax_credits;
        self.previous_tax_paid = inputs.previous_tax_paid;
    }
}

/// For creating new calculations (no id, derived amounts or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxCalculation {
    pub user_id: String,
    pub tax_category: TaxCategory,
    pub calculation_type: CalculationType,
    pub period: String,
    pub year: i32,
    pub inputs: TaxInputs,
    pub notes: Option<String>,
}

/// A caller's edit of an existing calculation. `None` leaves a field as is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalculationUpdate {
    pub inputs: InputChanges,
    pub status: Option<CalculationStatus>,
    pub notes: Option<String>,
}

/// Narrows a listing. Unset fields match everything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalculationFilter {
    pub user_id: Option<String>,
    pub year: Option<i32>,
    pub status: Option<CalculationStatus>,
    pub tax_category: Option<TaxCategory>,
}

impl CalculationFilter {
    pub fn matches(
        &self,
        calc: &TaxCalculation,
    ) -> bool {
        self.user_id.as_ref().is_none_or(|u| *u == calc.user_id)
            && self.year.is_none_or(|y| y == calc.year)
            && self.status.is_none_or(|s| s == calc.status)
            && self
                .tax_category
                .as_ref()
                .is_none_or(|c| *c == calc.tax_category)
    }
}
