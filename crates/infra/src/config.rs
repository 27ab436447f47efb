//! Process configuration, read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `DATABASE_URL` | unset (in-memory store) |
//! | `DATABASE_MAX_CONNECTIONS` | `5` |
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `FEED_URL` | `https://famme.no/products.json` |
//! | `FEED_TIMEOUT_SECS` | `10` |
//! | `SEED_LIMIT` | `10` |
//! | `SEED_ON_STARTUP` | `true` |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::seed::DEFAULT_SEED_LIMIT;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_FEED_URL: &str = "https://famme.no/products.json";
pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Postgres URL; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub feed_url: String,
    pub feed_timeout: Duration,
    pub seed_limit: usize,
    pub seed_on_startup: bool,
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
            bind_addr: match get("BIND_ADDR") {
                Some(raw) => parse("BIND_ADDR", raw)?,
                None => parse("BIND_ADDR", DEFAULT_BIND_ADDR.to_string())?,
            },
            feed_url: get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            feed_timeout: Duration::from_secs(parse_or(
                "FEED_TIMEOUT_SECS",
                get("FEED_TIMEOUT_SECS"),
                DEFAULT_FEED_TIMEOUT_SECS,
            )?),
            seed_limit: parse_or("SEED_LIMIT", get("SEED_LIMIT"), DEFAULT_SEED_LIMIT)?,
            seed_on_startup: match get("SEED_ON_STARTUP") {
                Some(raw) => parse_bool("SEED_ON_STARTUP", raw)?,
                None => true,
            },
        })
    }

    pub fn uses_persistent_store(&self) -> bool {
        self.database_url.is_some()
    }
}

fn parse<T>(key: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = raw.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value: raw,
    })
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |raw| parse(key, raw))
}

fn parse_bool(key: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected a boolean".to_string(),
        }),
    }
}
