use async_trait::async_trait;

use pajak_core::db::repository::{CalculationRepository, RepositoryError};
use pajak_core::db::{DbConfig, RepositoryFactory};

use crate::repository::SqliteRepository;

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`pajak_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use pajak_core::db::RepositoryRegistry;
/// use pajak_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and bring
    /// its schema up to date.
    ///
    /// Accepted connection-string values:
    /// * A bare file path, e.g. `"pajak.db"`. The file is created if it
    ///   does not exist.
    /// * A sqlx URL, e.g. `"sqlite:pajak.db?mode=rwc"`.
    /// * `":memory:"`, an ephemeral in-memory database.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn CalculationRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        Ok(Box::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use pajak_core::db::{DbConfig, RepositoryFactory, RepositoryRegistry};
    use pajak_core::CalculationFilter;
    use pretty_assertions::assert_eq;

    use super::SqliteRepositoryFactory;

    fn in_memory() -> DbConfig {
        DbConfig {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }

    #[test]
    fn backend_name_is_sqlite() {
        assert_eq!(SqliteRepositoryFactory.backend_name(), "sqlite");
    }

    #[tokio::test]
    async fn creates_migrated_in_memory_repository() {
        let repo = SqliteRepositoryFactory
            .create(&in_memory())
            .await
            .expect("failed to create in-memory repository");

        let listed = repo
            .list_calculations(&CalculationFilter::default())
            .await
            .expect("schema should exist after migrations");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn resolves_through_registry() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(SqliteRepositoryFactory));

        let result = registry.create(&in_memory()).await;
        assert!(result.is_ok(), "registry failed: {:?}", result.err().map(|e| e.to_string()));
    }

    #[tokio::test]
    async fn unopenable_path_is_a_connection_error() {
        let config = DbConfig {
            backend: "sqlite".to_string(),
            connection_string: "/nonexistent-dir/for/pajak/test.db".to_string(),
        };

        let result = SqliteRepositoryFactory.create(&config).await;
        assert!(matches!(
            result.err(),
            Some(pajak_core::RepositoryError::Connection(_))
        ));
    }
}
