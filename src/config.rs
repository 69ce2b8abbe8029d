//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{CacheError, Result};

/// Which store implementation to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// In-process map with lazy expiry and background sweep
    #[default]
    Memory,
    /// External Redis server
    Remote,
}

impl FromStr for Backend {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Backend::Memory),
            "remote" | "redis" => Ok(Backend::Remote),
            other => Err(CacheError::Config(format!(
                "unknown cache backend '{}', expected 'memory' or 'remote'",
                other
            ))),
        }
    }
}

/// Expiry and sizing options shared by every store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// TTL applied when a caller passes a zero TTL
    pub default_ttl: Duration,
    /// Upper bound for any requested TTL
    pub max_ttl: Duration,
    /// Maximum number of entries, 0 = unbounded (in-process store only)
    pub max_size: usize,
    /// Interval between background sweeps (in-process store only)
    pub sweep_interval: Duration,
}

/// Default TTL for cached entries
pub const DEFAULT_TTL: Duration = Duration::from_secs(2);
/// Default TTL ceiling
pub const DEFAULT_MAX_TTL: Duration = Duration::from_secs(30);
/// Default sweep interval
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Default deadline for a single remote call
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(500);

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_ttl: DEFAULT_MAX_TTL,
            max_size: 0,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl StoreConfig {
    /// Returns the sweep interval, substituting the default for zero.
    pub fn effective_sweep_interval(&self) -> Duration {
        if self.sweep_interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            self.sweep_interval
        }
    }
}

/// Connection parameters for the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// host:port of the Redis server
    pub address: String,
    /// Optional AUTH password
    pub password: Option<String>,
    /// Logical database index, flushed by `clear`
    pub database: i64,
    /// Deadline applied to every network call
    pub op_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            password: None,
            database: 0,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }
}

impl RemoteConfig {
    /// Builds the `redis://` connection URL, percent-encoding the password.
    pub fn url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("redis://{}/{}", self.address, self.database))
            .map_err(|e| {
                CacheError::Config(format!("invalid redis address '{}': {}", self.address, e))
            })?;

        if let Some(password) = &self.password {
            // set_password leaves '%' alone and the client percent-decodes
            let escaped = password.replace('%', "%25");
            url.set_password(Some(&escaped)).map_err(|_| {
                CacheError::Config(format!(
                    "redis address '{}' cannot carry a password",
                    self.address
                ))
            })?;
        }
        Ok(url)
    }
}

/// Full cache configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub backend: Backend,
    pub store: StoreConfig,
    pub remote: RemoteConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `remote` (default: memory)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in ms (default: 2000)
    /// - `CACHE_MAX_TTL_MS` - TTL ceiling in ms (default: 30000)
    /// - `CACHE_MAX_SIZE` - Maximum entries, 0 = unbounded (default: 0)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweep frequency in ms (default: 60000)
    /// - `REDIS_ADDR` - Redis host:port (default: 127.0.0.1:6379)
    /// - `REDIS_PASSWORD` - Redis password (default: none)
    /// - `REDIS_DB` - Redis database index (default: 0)
    /// - `CACHE_OP_TIMEOUT_MS` - Remote call deadline in ms (default: 500)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        let millis = |name: &str, default: Duration| {
            parsed(name).map(Duration::from_millis).unwrap_or(default)
        };

        let backend = match lookup("CACHE_BACKEND") {
            Some(value) => value.parse()?,
            None => Backend::Memory,
        };

        let store = StoreConfig {
            default_ttl: millis("CACHE_DEFAULT_TTL_MS", DEFAULT_TTL),
            max_ttl: millis("CACHE_MAX_TTL_MS", DEFAULT_MAX_TTL),
            max_size: parsed("CACHE_MAX_SIZE").unwrap_or(0) as usize,
            sweep_interval: millis("CACHE_SWEEP_INTERVAL_MS", DEFAULT_SWEEP_INTERVAL),
        };

        let defaults = RemoteConfig::default();
        let remote = RemoteConfig {
            address: lookup("REDIS_ADDR").unwrap_or(defaults.address),
            password: lookup("REDIS_PASSWORD").filter(|p| !p.is_empty()),
            database: lookup("REDIS_DB")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.database),
            op_timeout: millis("CACHE_OP_TIMEOUT_MS", defaults.op_timeout),
        };

        Ok(Self {
            backend,
            store,
            remote,
        })
    }
}
