//! # Agent Configuration
//!
//! Configuration is layered, later layers winning:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `alchemist.toml` in the working directory)
//! 3. Environment variables
//! 4. CLI flags
//!
//! ## Environment Variables
//!
//! - `ALCHEMIST_DB`: Path of the element store database
//! - `ALCHEMIST_METRICS_DB`: Path of the metrics log database
//! - `ALCHEMIST_ORACLE_URL`: Oracle endpoint URL
//! - `ALCHEMIST_PACE_MS`: Pause between iterations in milliseconds

use crate::error::DiscoveryError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "alchemist.toml";

/// Oracle endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleConfig {
    /// Endpoint receiving `?first=..&second=..`.
    pub base_url: String,
    /// `Referer` the oracle insists on.
    pub referer: String,
    /// Browser-like `User-Agent`.
    pub user_agent: String,
    /// Transport timeout for one call.
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://neal.fun/api/infinite-craft/pair".to_string(),
            referer: "https://neal.fun/infinite-craft/".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0"
                .to_string(),
            timeout_secs: 30,
        }
    }
}

/// Full agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Element store database.
    pub database: PathBuf,
    /// Metrics log database.
    pub metrics_database: PathBuf,
    /// Pause between iterations, in milliseconds.
    pub pace_ms: u64,
    /// Fixed RNG seed for reproducible sampling.
    pub seed: Option<u64>,
    /// Oracle endpoint settings.
    pub oracle: OracleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("alchemist.redb"),
            metrics_database: PathBuf::from("alchemist-metrics.redb"),
            pace_ms: 1000,
            seed: None,
            oracle: OracleConfig::default(),
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, DiscoveryError> {
        toml::from_str(text).map_err(|e| DiscoveryError::Config(e.to_string()))
    }

    /// Load from an explicit file, or from `alchemist.toml` if it exists,
    /// or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, DiscoveryError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|e| {
            DiscoveryError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `ALCHEMIST_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), DiscoveryError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `ALCHEMIST_*` overrides from an arbitrary lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), DiscoveryError> {
        if let Some(db) = lookup("ALCHEMIST_DB") {
            self.database = PathBuf::from(db);
        }
        if let Some(db) = lookup("ALCHEMIST_METRICS_DB") {
            self.metrics_database = PathBuf::from(db);
        }
        if let Some(url) = lookup("ALCHEMIST_ORACLE_URL") {
            self.oracle.base_url = url;
        }
        if let Some(pace) = lookup("ALCHEMIST_PACE_MS") {
            self.pace_ms = pace.trim().parse().map_err(|_| {
                DiscoveryError::Config(format!("ALCHEMIST_PACE_MS is not a number: {pace:?}"))
            })?;
        }
        Ok(())
    }

    /// Pause between iterations.
    #[must_use]
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }
}
