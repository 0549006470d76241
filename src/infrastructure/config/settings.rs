//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; `MERCHANT_DATA_DIR` overrides
//! the database directory.
//!
//! # Example
//!
//! ```no_run
//! use merchant::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::jobs::{CleanupConfig, TickerConfig};
use super::logging::LoggingConfig;
use crate::application::EconomySettings;
use crate::domain::TenantId;
use crate::error::{ConfigError, Result};

/// Environment variable overriding [`DatabaseConfig::data_dir`].
pub const DATA_DIR_ENV: &str = "MERCHANT_DATA_DIR";

/// Per-tenant SQLite storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding one `<tenant>.db` file per tenant.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Pooled connections per tenant database.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

const fn default_pool_size() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            pool_size: default_pool_size(),
        }
    }
}

impl DatabaseConfig {
    /// Database file of one tenant.
    #[must_use]
    pub fn tenant_path(&self, tenant: &TenantId) -> PathBuf {
        self.data_dir.join(format!("{tenant}.db"))
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Inventory capacity and price window size.
    #[serde(default)]
    pub ledger: EconomySettings,

    /// Periodic price updates.
    #[serde(default)]
    pub ticker: TickerConfig,

    /// Daily pruning of expired cooldowns and old prices.
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Tenants opened by `merchant run`.
    #[serde(default)]
    pub tenants: Vec<String>,
}

/// Check that `id` is usable as a tenant identifier and file name.
///
/// # Errors
/// Returns [`ConfigError::InvalidValue`] unless `id` is non-empty ASCII
/// alphanumerics, `-` or `_`.
#[allow(clippy::result_large_err)]
pub fn parse_tenant_id(id: &str) -> Result<TenantId> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ConfigError::InvalidValue {
            field: "tenant",
            reason: format!("'{id}' must be ASCII letters, digits, '-' or '_'"),
        }
        .into());
    }
    Ok(TenantId::new(id))
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// Applies the `MERCHANT_DATA_DIR` override before validating.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML content is malformed
    /// - Validation fails (e.g., a zero interval or a bad tenant name)
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                config.database.data_dir = PathBuf::from(dir);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::parse_toml("")
        }
    }

    /// Validate configuration values.
    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.database.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.data_dir",
            }
            .into());
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.pool_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.ledger.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ledger.window_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.ledger.inventory_capacity < 0 {
            return Err(ConfigError::InvalidValue {
                field: "ledger.inventory_capacity",
                reason: "must not be negative".to_string(),
            }
            .into());
        }
        self.ticker.validate()?;
        self.cleanup.validate()?;

        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            parse_tenant_id(tenant)?;
            if !seen.insert(tenant.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "tenants",
                    reason: format!("'{tenant}' is listed twice"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Configured tenant identifiers.
    #[must_use]
    pub fn tenant_ids(&self) -> Vec<TenantId> {
        self.tenants.iter().map(TenantId::new).collect()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
