use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::errors::{HouseholdError, Result};
use crate::utils::format::format_amount;
use crate::utils::paths::{config_file_in, ensure_dir, resolve_base, write_atomic};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub locale: String,
    pub currency: String,
    /// Months ahead of today that projections are shown or materialized for.
    pub projection_months: u32,
    pub due_soon_days: u32,
    /// How far back unsettled plan lines are still reported as overdue.
    pub overdue_days: u32,
    pub low_stock_threshold: f64,
    /// Backups kept per household file; older ones are pruned.
    pub backup_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            currency: "USD".into(),
            projection_months: 3,
            due_soon_days: 7,
            overdue_days: 31,
            low_stock_threshold: 1.0,
            backup_retention: 5,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.currency.trim().is_empty() {
            return Err(HouseholdError::Config("currency cannot be empty".into()));
        }
        if !self.low_stock_threshold.is_finite() || self.low_stock_threshold < 0.0 {
            return Err(HouseholdError::Config(format!(
                "low stock threshold must not be negative, got {}",
                self.low_stock_threshold
            )));
        }
        Ok(())
    }

    /// Renders `amount` in the configured currency with the locale's separators.
    pub fn format_amount(&self, amount: f64) -> String {
        format_amount(&self.locale, &self.currency, amount)
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(resolve_base(None))
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: config_file_in(&base),
        })
    }

    /// Reads the configuration, falling back to defaults when no file exists yet.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data).map_err(|err| {
            HouseholdError::Config(format!("{}: {err}", self.path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
