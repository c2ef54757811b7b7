//! Configuration loading and representation.
//!
//! Settings come from the process environment. Every key has a default except
//! `DATABASE_URL`, which is required once persistent stores are switched on.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::reconciler::DEFAULT_MAX_ATTEMPTS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be set")]
    Missing { key: &'static str },

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub seed_catalog: bool,
    pub grant_max_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            use_persistent_stores: false,
            database_url: None,
            seed_catalog: true,
            grant_max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: Duration::from_millis(10_000),
        }
    }
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_with<T, E: std::fmt::Display>(
    key: &'static str,
    value: String,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    parse(value.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = lookup("BIND_ADDR") {
            cfg.bind_addr = parse_with("BIND_ADDR", v, str::parse::<SocketAddr>)?;
        }
        if let Some(v) = lookup("USE_PERSISTENT_STORES") {
            cfg.use_persistent_stores = parse_bool("USE_PERSISTENT_STORES", v)?;
        }
        cfg.database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if let Some(v) = lookup("SEED_CATALOG") {
            cfg.seed_catalog = parse_bool("SEED_CATALOG", v)?;
        }
        if let Some(v) = lookup("GRANT_MAX_ATTEMPTS") {
            let attempts = parse_with("GRANT_MAX_ATTEMPTS", v.clone(), str::parse::<u32>)?;
            if attempts == 0 {
                return Err(ConfigError::Invalid {
                    key: "GRANT_MAX_ATTEMPTS",
                    value: v,
                    reason: "must be at least 1".to_string(),
                });
            }
            cfg.grant_max_attempts = attempts;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_MS") {
            let ms = parse_with("REQUEST_TIMEOUT_MS", v, str::parse::<u64>)?;
            cfg.request_timeout = Duration::from_millis(ms);
        }

        if cfg.use_persistent_stores && cfg.database_url.is_none() {
            return Err(ConfigError::Missing { key: "DATABASE_URL" });
        }

        Ok(cfg)
    }
}
