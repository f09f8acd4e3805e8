//! Tax computation and approval workflow for SPT calculations.
//!
//! The crate is layered leaf-first:
//!
//! * [`calculations`] - rate scheme resolution, the pure computation engine
//!   and the auditable breakdown it produces.
//! * [`workflow`] - the calculation record lifecycle and the service that
//!   persists it through an injected [`CalculationRepository`].
//! * [`auth`] - the permission predicate the workflow consults.
//! * [`db`] - repository traits, the backend registry and an in-memory
//!   backend.

pub mod auth;
pub mod calculations;
pub mod db;
pub mod error;
pub mod models;
pub mod workflow;

pub use auth::{PermissionPolicy, RoleBasedPolicy};
pub use db::repository::{CalculationRepository, RepositoryError};
pub use error::CalculationError;
pub use models::*;
