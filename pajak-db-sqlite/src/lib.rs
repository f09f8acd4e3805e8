//! SQLite backend for the pajak calculation store.
//!
//! Register [`SqliteRepositoryFactory`] with a
//! [`pajak_core::db::RepositoryRegistry`] to make the `"sqlite"` backend
//! available.

mod decimal;
pub mod factory;
pub mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
