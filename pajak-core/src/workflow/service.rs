//! Calculation workflow service.
//!
//! Glues the pure [`CalculationLifecycle`] to the injected store and
//! permission predicate. Each operation reads the current record, lets the
//! lifecycle decide the next state, and persists the result with a single
//! repository write.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::auth::PermissionPolicy;
use crate::calculations::TaxComputation;
use crate::db::CalculationRepository;
use crate::error::CalculationError;
use crate::models::{
    Actor, CalculationFilter, CalculationUpdate, NewTaxCalculation, TaxCalculation, TaxCategory,
    TaxInputs,
};
use crate::workflow::lifecycle::{Authority, CalculationLifecycle};
use crate::workflow::report::{self, AuditReport, UserTaxSummary};

pub struct CalculationService {
    repository: Arc<dyn CalculationRepository>,
    policy: Arc<dyn PermissionPolicy>,
    lifecycle: CalculationLifecycle,
}

impl CalculationService {
    pub fn new(
        repository: Arc<dyn CalculationRepository>,
        policy: Arc<dyn PermissionPolicy>,
    ) -> Self {
        Self {
            repository,
            policy,
            lifecycle: CalculationLifecycle::default(),
        }
    }

    fn authority(
        &self,
        actor: &Actor,
    ) -> Authority {
        Authority {
            role: actor.role,
            elevated: self.policy.can_elevate_status(actor.role),
        }
    }

    async fn load(
        &self,
        id: i64,
    ) -> Result<TaxCalculation, CalculationError> {
        self.repository
            .get_calculation(id)
            .await
            .map_err(|e| CalculationError::for_record(id, e))
    }

    async fn store(
        &self,
        calc: &TaxCalculation,
    ) -> Result<(), CalculationError> {
        self.repository
            .update_calculation(calc)
            .await
            .map_err(|e| CalculationError::for_record(calc.id, e))
    }

    /// Computes without persisting anything.
    pub fn preview(
        &self,
        category: &TaxCategory,
        inputs: &TaxInputs,
    ) -> Result<TaxComputation, CalculationError> {
        self.lifecycle.engine().compute(category, inputs)
    }

    /// Computes and stores a new calculation in CALCULATED status.
    pub async fn create(
        &self,
        actor: &Actor,
        request: NewTaxCalculation,
    ) -> Result<TaxCalculation, CalculationError> {
        let record = self.lifecycle.create(request, Utc::now())?;
        let created = self.repository.create_calculation(record).await?;

        info!(
            id = created.id,
            user = %created.user_id,
            category = %created.tax_category,
            final_tax_amount = %created.final_tax_amount,
            actor = %actor.user_id,
            "tax calculation created"
        );
        Ok(created)
    }

    /// Stores a new calculation in DRAFT status without computing it.
    pub async fn create_draft(
        &self,
        actor: &Actor,
        request: NewTaxCalculation,
    ) -> Result<TaxCalculation, CalculationError> {
        let record = self.lifecycle.create_draft(request, Utc::now());
        let created = self.repository.create_calculation(record).await?;

        info!(id = created.id, actor = %actor.user_id, "draft tax calculation created");
        Ok(created)
    }

    /// Computes a stored draft, moving it to CALCULATED.
    pub async fn calculate_draft(
        &self,
        actor: &Actor,
        id: i64,
    ) -> Result<TaxCalculation, CalculationError> {
        let current = self.load(id).await?;
        let next = self.lifecycle.calculate_draft(&current, Utc::now())?;
        self.store(&next).await?;

        info!(id, actor = %actor.user_id, "draft tax calculation computed");
        Ok(next)
    }

    pub async fn get(
        &self,
        id: i64,
    ) -> Result<TaxCalculation, CalculationError> {
        self.load(id).await
    }

    pub async fn list(
        &self,
        filter: &CalculationFilter,
    ) -> Result<Vec<TaxCalculation>, CalculationError> {
        Ok(self.repository.list_calculations(filter).await?)
    }

    /// Applies a caller's edit. On any error nothing is written, and an edit
    /// that changes nothing is not written either.
    pub async fn update(
        &self,
        actor: &Actor,
        id: i64,
        update: CalculationUpdate,
    ) -> Result<TaxCalculation, CalculationError> {
        let current = self.load(id).await?;

        let next = self
            .lifecycle
            .apply_update(&current, &update, self.authority(actor), Utc::now())
            .inspect_err(|e| {
                warn!(id, actor = %actor.user_id, role = %actor.role, error = %e, "update refused");
            })?;

        if next == current {
            debug!(id, actor = %actor.user_id, "update changes nothing");
            return Ok(next);
        }
        self.store(&next).await?;

        info!(
            id,
            actor = %actor.user_id,
            from = %current.status,
            to = %next.status,
            "tax calculation updated"
        );
        Ok(next)
    }

    /// Removes a calculation. Elevated roles only.
    pub async fn delete(
        &self,
        actor: &Actor,
        id: i64,
    ) -> Result<(), CalculationError> {
        if !self.policy.can_delete(actor.role) {
            warn!(id, actor = %actor.user_id, role = %actor.role, "delete refused");
            return Err(CalculationError::Permission {
                role: actor.role,
                action: "delete a tax calculation".to_string(),
            });
        }

        self.repository
            .delete_calculation(id)
            .await
            .map_err(|e| CalculationError::for_record(id, e))?;

        info!(id, actor = %actor.user_id, "tax calculation deleted");
        Ok(())
    }

    /// Checks a stored record against its breakdown.
    pub async fn audit(
        &self,
        id: i64,
    ) -> Result<AuditReport, CalculationError> {
        let record = self.load(id).await?;
        let report = AuditReport::for_record(&record)?;
        if !report.is_consistent() {
            warn!(id, mismatches = report.mismatches.len(), "stored calculation disagrees with its breakdown");
        }
        Ok(report)
    }

    /// Per-user totals over the calculations matching `filter`.
    pub async fn summarize(
        &self,
        filter: &CalculationFilter,
    ) -> Result<Vec<UserTaxSummary>, CalculationError> {
        let calculations = self.list(filter).await?;
        report::summarize(&calculations)
    }
}
