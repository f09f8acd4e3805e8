use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CalculationFilter, TaxCalculation};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stored breakdown could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Store for tax calculations, keyed by id.
///
/// Implementations must write every field of a calculation in one atomic
/// operation so readers never observe a status that disagrees with the
/// stored amounts or breakdown.
#[async_trait]
pub trait CalculationRepository: Send + Sync {
    /// Inserts `calc` and returns it with its store-assigned id. The incoming
    /// `id` is ignored.
    async fn create_calculation(
        &self,
        calc: TaxCalculation,
    ) -> Result<TaxCalculation, RepositoryError>;

    async fn get_calculation(&self, id: i64) -> Result<TaxCalculation, RepositoryError>;

    /// Replaces the stored calculation with the same id.
    async fn update_calculation(&self, calc: &TaxCalculation) -> Result<(), RepositoryError>;

    async fn delete_calculation(&self, id: i64) -> Result<(), RepositoryError>;

    /// Lists matching calculations, newest first.
    async fn list_calculations(
        &self,
        filter: &CalculationFilter,
    ) -> Result<Vec<TaxCalculation>, RepositoryError>;
}
