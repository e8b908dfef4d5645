//! Runtime configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! TOML file, and command-line flags. `RUST_LOG` still overrides the log
//! level at subscriber setup.
//!
//! ```toml
//! backend = "sqlite"
//! database = "quotes.db"
//! tax_rate = "0.23"
//! log_level = "info"
//! log_file = "quote.log"
//! ```
use std::fs;
use std::path::{Path, PathBuf};

use quote_core::api::BackendConfig;
use quote_core::calculations::{DEFAULT_TAX_RATE, PricingCalculator};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "quote.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("tax rate must be between 0 and 1, got {0}")]
    InvalidTaxRate(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub backend: String,
    pub database: String,
    pub tax_rate: Decimal,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            database: "quotes.db".to_string(),
            tax_rate: DEFAULT_TAX_RATE,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Flag values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub backend: Option<String>,
    pub database: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads `path` if given (it must exist), else [`DEFAULT_CONFIG_FILE`] if
    /// present, else the defaults; then applies `overrides`.
    pub fn load(
        path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        let config = base.with_overrides(overrides).validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn with_overrides(
        self,
        overrides: ConfigOverrides,
    ) -> Self {
        Self {
            backend: overrides.backend.unwrap_or(self.backend),
            database: overrides.database.unwrap_or(self.database),
            tax_rate: overrides.tax_rate.unwrap_or(self.tax_rate),
            log_level: overrides.log_level.unwrap_or(self.log_level),
            log_file: overrides.log_file.or(self.log_file),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(ConfigError::InvalidTaxRate(self.tax_rate));
        }
        Ok(self)
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            backend: self.backend.clone(),
            connection_string: self.database.clone(),
        }
    }

    pub fn calculator(&self) -> PricingCalculator {
        PricingCalculator::new(self.tax_rate)
    }
}
