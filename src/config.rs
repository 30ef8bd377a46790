//! Runtime configuration
//!
//! Every setting has a default; `SCREENER_*` environment variables override
//! them. A variable that is set but does not parse is a configuration error.

use crate::error::{Result, ScreenerError};
use crate::query::QueryLimits;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Screener service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenerConfig {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Maximum pooled connections
    pub pool_size: u32,
    /// Seconds to wait for a pooled connection
    pub pool_timeout_secs: u64,
    pub max_results: u32,
    pub default_limit: u32,
    /// Maximum timeframes in one screen request
    pub max_timeframes: usize,
    /// Screen requests per second
    pub screen_rate_limit: u32,
    /// Metadata requests per second
    pub api_rate_limit: u32,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("screener.db"),
            host: "0.0.0.0".to_string(),
            port: 8001,
            pool_size: 20,
            pool_timeout_secs: 30,
            max_results: 10_000,
            default_limit: 100,
            max_timeframes: 5,
            screen_rate_limit: 20,
            api_rate_limit: 100,
        }
    }
}

impl ScreenerConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup(key)`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("SCREENER_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("SCREENER_HOST") {
            config.host = host;
        }
        override_parsed(&lookup, "SCREENER_PORT", &mut config.port)?;
        override_parsed(&lookup, "SCREENER_POOL_SIZE", &mut config.pool_size)?;
        override_parsed(&lookup, "SCREENER_POOL_TIMEOUT_SECS", &mut config.pool_timeout_secs)?;
        override_parsed(&lookup, "SCREENER_MAX_RESULTS", &mut config.max_results)?;
        override_parsed(&lookup, "SCREENER_DEFAULT_LIMIT", &mut config.default_limit)?;
        override_parsed(&lookup, "SCREENER_MAX_TIMEFRAMES", &mut config.max_timeframes)?;
        override_parsed(&lookup, "SCREENER_SCREEN_RATE_LIMIT", &mut config.screen_rate_limit)?;
        override_parsed(&lookup, "SCREENER_API_RATE_LIMIT", &mut config.api_rate_limit)?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(ScreenerError::Config("pool_size must be at least 1".to_string()));
        }
        if self.max_results == 0 {
            return Err(ScreenerError::Config("max_results must be at least 1".to_string()));
        }
        if self.default_limit == 0 || self.default_limit > self.max_results {
            return Err(ScreenerError::Config(format!(
                "default_limit must be between 1 and max_results ({})",
                self.max_results
            )));
        }
        if self.max_timeframes == 0 {
            return Err(ScreenerError::Config("max_timeframes must be at least 1".to_string()));
        }
        if self.screen_rate_limit == 0 || self.api_rate_limit == 0 {
            return Err(ScreenerError::Config("rate limits must be at least 1/s".to_string()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ScreenerError::Config(format!("Invalid address {}:{}: {}", self.host, self.port, e)))
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_secs)
    }

    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            max_results: self.max_results,
            default_limit: self.default_limit,
        }
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| ScreenerError::Config(format!("{}='{}': {}", key, raw, e)))?;
    }
    Ok(())
}
