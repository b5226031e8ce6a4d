use std::env;
use std::time::Duration;

use crate::error::{Result, ShardError};
use crate::health::ProbeConfig;

/// Engine configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Health probe loop configuration
    pub probe: ProbeConfig,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to the [`ProbeConfig`] defaults; values
    /// that are present but unparsable are configuration errors.
    pub fn from_env() -> Result<Self> {
        let defaults = ProbeConfig::default();

        Ok(Config {
            probe: ProbeConfig {
                interval: Duration::from_secs(parse_env_or(
                    "SHARDLB_PROBE_INTERVAL_SECS",
                    defaults.interval.as_secs(),
                )?),
                timeout: Duration::from_secs(parse_env_or(
                    "SHARDLB_PROBE_TIMEOUT_SECS",
                    defaults.timeout.as_secs(),
                )?),
                workers: parse_env_or("SHARDLB_PROBE_WORKERS", defaults.workers)?.max(1),
                backoff_base: Duration::from_secs(parse_env_or(
                    "SHARDLB_BACKOFF_BASE_SECS",
                    defaults.backoff_base.as_secs(),
                )?),
                backoff_cap: Duration::from_secs(parse_env_or(
                    "SHARDLB_BACKOFF_CAP_SECS",
                    defaults.backoff_cap.as_secs(),
                )?),
            },
        })
    }
}

/// Parse an environment variable, falling back to a default when unset
fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ShardError::InvalidConfig(format!("{} must be a valid number", key))),
        Err(_) => Ok(default),
    }
}
