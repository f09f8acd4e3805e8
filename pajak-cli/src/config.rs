//! `pajak.toml` configuration.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "pajak.db"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Every table and key is optional. Command-line flags override what the file
//! says.

use std::path::{Path, PathBuf};

use pajak_core::db::DbConfig;
use serde::Deserialize;
use thiserror::Error;

/// File read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "pajak.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `pajak_core=debug`.
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `explicit` when given (it must exist), otherwise
    /// [`DEFAULT_CONFIG_FILE`] when present, otherwise the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").expect("empty config is valid");

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database.backend, "sqlite");
        assert_eq!(config.database.connection_string, ":memory:");
        assert_eq!(config.logging.level, None);
    }

    #[test]
    fn reads_both_tables() {
        let config = AppConfig::from_toml_str(
            r#"
            [database]
            backend = "memory"
            connection_string = ""

            [logging]
            level = "pajak_core=debug"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.database.backend, "memory");
        assert_eq!(config.database.connection_string, "");
        assert_eq!(config.logging.level.as_deref(), Some("pajak_core=debug"));
    }

    #[test]
    fn partial_database_table_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [database]
            connection_string = "pajak.db"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.database.backend, "sqlite");
        assert_eq!(config.database.connection_string, "pajak.db");
    }

    #[test]
    fn wrong_type_is_rejected() {
        let result = AppConfig::from_toml_str("[logging]\nlevel = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let result = AppConfig::discover(Some(Path::new("/nonexistent/pajak.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
