//! In-memory [`CalculationRepository`] backend.
//!
//! Registered under the `"memory"` backend name. Nothing survives the
//! process; useful for previews, tests and dry runs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{CalculationRepository, RepositoryError};
use crate::models::{CalculationFilter, TaxCalculation};

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    calculations: BTreeMap<i64, TaxCalculation>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Database("in-memory store poisoned".to_string()))
    }
}

#[async_trait]
impl CalculationRepository for InMemoryRepository {
    async fn create_calculation(
        &self,
        mut calc: TaxCalculation,
    ) -> Result<TaxCalculation, RepositoryError> {
        let mut store = self.store()?;
        store.next_id += 1;
        calc.id = store.next_id;
        store.calculations.insert(calc.id, calc.clone());
        Ok(calc)
    }

    async fn get_calculation(
        &self,
        id: i64,
    ) -> Result<TaxCalculation, RepositoryError> {
        self.store()?
            .calculations
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_calculation(
        &self,
        calc: &TaxCalculation,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        let slot = store
            .calculations
            .get_mut(&calc.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = calc.clone();
        Ok(())
    }

    async fn delete_calculation(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        self.store()?
            .calculations
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_calculations(
        &self,
        filter: &CalculationFilter,
    ) -> Result<Vec<TaxCalculation>, RepositoryError> {
        Ok(self
            .store()?
            .calculations
            .values()
            .rev()
            .filter(|calc| filter.matches(calc))
            .cloned()
            .collect())
    }
}

/// [`RepositoryFactory`] for the `"memory"` backend. The connection string is
/// ignored.
pub struct InMemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for InMemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn CalculationRepository>, RepositoryError> {
        Ok(Box::new(InMemoryRepository::new()))
    }
}
