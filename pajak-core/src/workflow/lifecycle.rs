//! The calculation record lifecycle.
//!
//! Every function here is pure: it takes the current record, the caller's
//! request and the clock reading, and returns the record as it should be
//! persisted. Nothing is written, so a rejected request leaves the stored
//! record untouched by construction.
//!
//! Rules:
//!
//! * creation computes immediately and lands in CALCULATED; drafts skip the
//!   computation and land in DRAFT;
//! * any change to an input amount recomputes and forces CALCULATED, whatever
//!   the prior status ([`CalculationLifecycle::recalculate`]);
//! * a status change alone must be an edge of
//!   [`CalculationStatus::can_transition_to`] and, for the elevated statuses,
//!   requires an elevated role; entering VERIFIED stamps `verified_at`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calculations::{TaxComputation, TaxComputationEngine};
use crate::error::CalculationError;
use crate::models::{
    ActorRole, CalculationStatus, CalculationUpdate, NewTaxCalculation, TaxCalculation,
};

/// Who is asking, as far as the lifecycle is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authority {
    pub role: ActorRole,
    pub elevated: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationLifecycle {
    engine: TaxComputationEngine,
}

impl CalculationLifecycle {
    pub fn new(engine: TaxComputationEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &TaxComputationEngine {
        &self.engine
    }

    /// Builds a computed record in CALCULATED status.
    pub fn create(
        &self,
        request: NewTaxCalculation,
        now: DateTime<Utc>,
    ) -> Result<TaxCalculation, CalculationError> {
        let computation = self.engine.compute(&request.tax_category, &request.inputs)?;
        let mut record = self.create_draft(request, now);
        apply_computation(&mut record, computation);
        record.status = CalculationStatus::Calculated;
        Ok(record)
    }

    /// Builds an uncomputed record in DRAFT status.
    pub fn create_draft(
        &self,
        request: NewTaxCalculation,
        now: DateTime<Utc>,
    ) -> TaxCalculation {
        let mut record = TaxCalculation {
            id: 0,
            user_id: request.user_id,
            tax_category: request.tax_category,
            calculation_type: request.calculation_type,
            period: request.period,
            year: request.year,
            gross_income: Decimal::ZERO,
            deductible_expenses: Decimal::ZERO,
            tax_deductions: Decimal::ZERO,
            tax_credits: Decimal::ZERO,
            previous_tax_paid: Decimal::ZERO,
            taxable_income: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            calculated_tax: Decimal::ZERO,
            final_tax_amount: Decimal::ZERO,
            calculation_data: None,
            status: CalculationStatus::Draft,
            verified_at: None,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };
        record.set_inputs(&request.inputs);
        record
    }

    /// Recomputes `record` from its current inputs and forces it back to
    /// CALCULATED. This is the only path that lowers a status.
    pub fn recalculate(
        &self,
        record: &TaxCalculation,
        now: DateTime<Utc>,
    ) -> Result<TaxCalculation, CalculationError> {
        let computation = self
            .engine
            .compute(&record.tax_category, &record.inputs())?;

        let mut next = record.clone();
        apply_computation(&mut next, computation);
        if next.status != CalculationStatus::Calculated {
            debug!(
                id = record.id,
                from = %record.status,
                "recomputation resets status to CALCULATED"
            );
        }
        next.status = CalculationStatus::Calculated;
        next.updated_at = now;
        Ok(next)
    }

    /// Computes a DRAFT record for the first time.
    pub fn calculate_draft(
        &self,
        record: &TaxCalculation,
        now: DateTime<Utc>,
    ) -> Result<TaxCalculation, CalculationError> {
        if record.status != CalculationStatus::Draft {
            return Err(CalculationError::InvalidTransition {
                from: record.status,
                to: CalculationStatus::Calculated,
            });
        }
        self.recalculate(record, now)
    }

    /// Moves `record` to `next` without touching its amounts.
    pub fn change_status(
        &self,
        record: &TaxCalculation,
        next: CalculationStatus,
        authority: Authority,
        now: DateTime<Utc>,
    ) -> Result<TaxCalculation, CalculationError> {
        check_elevation(next, authority)?;

        if record.status == next {
            return Ok(record.clone());
        }

        if !record.status.can_transition_to(next) {
            return Err(CalculationError::InvalidTransition {
                from: record.status,
                to: next,
            });
        }

        let mut updated = record.clone();
        updated.status = next;
        if next == CalculationStatus::Verified {
            updated.verified_at = Some(now);
        }
        updated.updated_at = now;
        Ok(updated)
    }

    /// Applies a caller's edit and returns the record to persist.
    ///
    /// Permission is checked before anything else, even for the status the
    /// record already has. An edit that alters any input amount recomputes
    /// and forces CALCULATED; a status requested in the same edit is then
    /// dropped. Notes are applied in every case. An edit that changes nothing
    /// returns the record as it was, `updated_at` included.
    pub fn apply_update(
        &self,
        record: &TaxCalculation,
        update: &CalculationUpdate,
        authority: Authority,
        now: DateTime<Utc>,
    ) -> Result<TaxCalculation, CalculationError> {
        if let Some(status) = update.status {
            check_elevation(status, authority)?;
        }
        let requested = update.status.filter(|s| *s != record.status);

        let current_inputs = record.inputs();
        let mut next = if update.inputs.alters(&current_inputs) {
            if let Some(status) = requested {
                warn!(
                    id = record.id,
                    requested = %status,
                    "input amounts changed; requested status ignored"
                );
            }
            let mut edited = record.clone();
            edited.set_inputs(&update.inputs.apply_to(&current_inputs));
            self.recalculate(&edited, now)?
        } else if let Some(status) = requested {
            self.change_status(record, status, authority, now)?
        } else {
            record.clone()
        };

        if let Some(notes) = &update.notes {
            next.notes = Some(notes.clone());
        }
        if next == *record {
            return Ok(next);
        }
        next.updated_at = now;
        Ok(next)
    }
}

fn check_elevation(
    status: CalculationStatus,
    authority: Authority,
) -> Result<(), CalculationError> {
    if status.requires_elevation() && !authority.elevated {
        return Err(CalculationError::Permission {
            role: authority.role,
            action: format!("move a tax calculation to {status}"),
        });
    }
    Ok(())
}

fn apply_computation(
    record: &mut TaxCalculation,
    computation: TaxComputation,
) {
    record.taxable_income = computation.taxable_income;
    record.tax_rate = computation.tax_rate;
    record.calculated_tax = computation.calculated_tax;
    record.final_tax_amount = computation.final_tax_amount;
    record.calculation_data = Some(computation.breakdown);
}
