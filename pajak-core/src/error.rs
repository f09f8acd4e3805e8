use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::{ActorRole, CalculationStatus};

/// Errors surfaced by the computation engine and the calculation workflow.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CalculationError {
    /// Input that is not a usable number reached the engine, or the
    /// arithmetic left the representable decimal range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The actor's role may not perform the requested action.
    #[error("role {role} is not permitted to {action}")]
    Permission { role: ActorRole, action: String },

    #[error("tax calculation {0} not found")]
    NotFound(i64),

    /// The requested status change is not an edge of the workflow.
    #[error("cannot move tax calculation from {from} to {to}")]
    InvalidTransition {
        from: CalculationStatus,
        to: CalculationStatus,
    },

    /// The store failed. Carried unchanged from the repository.
    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}

impl CalculationError {
    /// Maps a repository error for an operation addressed at `id`, turning
    /// the store's `NotFound` into [`CalculationError::NotFound`].
    pub fn for_record(
        id: i64,
        err: RepositoryError,
    ) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound(id),
            other => Self::Persistence(other),
        }
    }
}
