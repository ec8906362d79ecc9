//! Relay configuration
//!
//! Read from `RELAY_*` environment variables; nested sections use a double
//! underscore, e.g. `RELAY_SETTLEMENT__BASE_URL` or
//! `RELAY_REPLAY__INTERVAL_SECS`. Every field has a default.

use serde::Deserialize;
use std::time::Duration;

use core_kernel::CoreError;
use domain_charging::RevenueSharingConfig;
use infra_db::DatabaseConfig;

use crate::error::RelayError;

const ENV_PREFIX: &str = "RELAY";
const ENV_PREFIX_SEPARATOR: &str = "_";
const ENV_SEPARATOR: &str = "__";

/// Relay configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub database: DatabaseConfig,
    pub settlement: RevenueSharingConfig,
    pub replay: ReplayConfig,
    pub log: LogSettings,
}

/// Replay loop settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Pause between replay passes
    pub interval_secs: u64,
    /// Dead letters fetched per pass
    pub batch_limit: usize,
    /// Exit after a single pass
    pub run_once: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            batch_limit: 100,
            run_once: false,
        }
    }
}

impl ReplayConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_source(Self::environment())
    }

    /// Loads configuration from the given environment source
    ///
    /// # Errors
    ///
    /// `RelayError::Config` when a variable cannot be parsed into its field
    pub fn from_source(environment: config::Environment) -> Result<Self, RelayError> {
        let config = config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// The `RELAY_*` environment source, before any overrides
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_PREFIX_SEPARATOR)
            .separator(ENV_SEPARATOR)
    }

    /// Rejects settings the relay cannot run with
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.database.url.trim().is_empty() {
            return Err(CoreError::configuration("database.url must not be empty"));
        }

        let base_url = self.settlement.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CoreError::configuration(format!(
                "settlement.base_url must be an http(s) URL, got {:?}",
                self.settlement.base_url
            )));
        }
        if self.settlement.cdr_source.trim().is_empty() {
            return Err(CoreError::configuration("settlement.cdr_source must not be empty"));
        }
        if self.settlement.timeout_secs == 0 {
            return Err(CoreError::configuration("settlement.timeout_secs must be positive"));
        }

        if self.replay.batch_limit == 0 {
            return Err(CoreError::configuration("replay.batch_limit must be positive"));
        }
        if !self.replay.run_once && self.replay.interval_secs == 0 {
            return Err(CoreError::configuration(
                "replay.interval_secs must be positive unless replay.run_once is set",
            ));
        }

        Ok(())
    }
}
