//! # Application Configuration
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! ```text
//!   built-in defaults
//!        │
//!        ▼
//!   meridian.toml          (optional, working directory)
//!        │
//!        ▼
//!   MERIDIAN_* variables   (MERIDIAN_DATABASE_PATH, MERIDIAN_LOG_FILTER, ...)
//! ```
//!
//! The result is validated once after loading; a bad value is reported with
//! the key that carries it.

use std::path::PathBuf;
use std::time::Duration;

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use meridian_db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::logging::DEFAULT_LOG_FILTER;

/// Base name of the optional configuration file (`meridian.toml`).
pub const CONFIG_FILE: &str = "meridian";

/// Prefix of the environment overrides.
pub const ENV_PREFIX: &str = "MERIDIAN";

/// Path value selecting an in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

const DEFAULT_DATABASE_PATH: &str = "meridian.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A value was read but is not acceptable.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Back-office settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    pub max_connections: u32,

    /// `tracing_subscriber::EnvFilter` directives.
    pub log_filter: String,

    /// Deadline applied to every store call made by a service.
    pub operation_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then `meridian.toml` if present, then `MERIDIAN_*`.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config = finish(builder)?;
        info!(
            database_path = %config.database_path.display(),
            operation_timeout_secs = config.operation_timeout_secs,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads defaults overlaid with a TOML document.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        finish(defaults()?.add_source(File::from_str(document, FileFormat::Toml)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database_path",
                message: "must not be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_connections",
                message: "must be at least 1".to_string(),
            });
        }
        if self.operation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "operation_timeout_secs",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    /// Pool settings for [`meridian_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        if self.is_in_memory() {
            return DbConfig::in_memory();
        }
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let fallback = AppConfig::default();
    let builder = Config::builder()
        .set_default(
            "database_path",
            fallback.database_path.to_string_lossy().into_owned(),
        )?
        .set_default("max_connections", i64::from(fallback.max_connections))?
        .set_default("log_filter", fallback.log_filter)?
        .set_default(
            "operation_timeout_secs",
            DEFAULT_OPERATION_TIMEOUT_SECS as i64,
        )?;
    Ok(builder)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
