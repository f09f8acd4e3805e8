//! Read-only views over stored calculations.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::calculations::common::checked_add;
use crate::calculations::{BreakdownMismatch, SchemeKind};
use crate::error::CalculationError;
use crate::models::{CalculationStatus, TaxCalculation};

/// Outcome of checking a stored record against its own breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub id: i64,
    pub status: CalculationStatus,
    /// `None` for drafts that were never computed.
    pub method: Option<SchemeKind>,
    pub mismatches: Vec<BreakdownMismatch>,
}

impl AuditReport {
    pub fn for_record(record: &TaxCalculation) -> Result<Self, CalculationError> {
        let (method, mismatches) = match &record.calculation_data {
            Some(breakdown) => (Some(breakdown.method), breakdown.audit(record)?),
            None => (None, Vec::new()),
        };

        Ok(Self {
            id: record.id,
            status: record.status,
            method,
            mismatches,
        })
    }

    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Per-taxpayer totals.
///
/// Drafts and rejected calculations are counted in `records` but excluded
/// from the amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserTaxSummary {
    pub user_id: String,
    pub records: usize,
    pub counted: usize,
    pub total_calculated_tax: Decimal,
    pub total_final_tax_amount: Decimal,
}

/// Groups `calculations` by owner, ordered by user id.
pub fn summarize(calculations: &[TaxCalculation]) -> Result<Vec<UserTaxSummary>, CalculationError> {
    let mut by_user: BTreeMap<&str, UserTaxSummary> = BTreeMap::new();

    for calc in calculations {
        let summary = by_user
            .entry(calc.user_id.as_str())
            .or_insert_with(|| UserTaxSummary {
                user_id: calc.user_id.clone(),
                records: 0,
                counted: 0,
                total_calculated_tax: Decimal::ZERO,
                total_final_tax_amount: Decimal::ZERO,
            });

        summary.records += 1;
        if matches!(
            calc.status,
            CalculationStatus::Draft | CalculationStatus::Rejected
        ) {
            continue;
        }

        summary.counted += 1;
        summary.total_calculated_tax = checked_add(
            summary.total_calculated_tax,
            calc.calculated_tax,
            "total calculated tax",
        )?;
        summary.total_final_tax_amount = checked_add(
            summary.total_final_tax_amount,
            calc.final_tax_amount,
            "total final tax amount",
        )?;
    }

    Ok(by_user.into_values().collect())
}
