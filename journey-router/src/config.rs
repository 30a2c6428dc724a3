//! Server configuration, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheConfig;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DELAY_REFRESH_SECS: u64 = 20;
const DEFAULT_BIKE_REFRESH_SECS: u64 = 60;

/// Errors in the server environment.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Everything the server binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Static network feed.
    pub feed: PathBuf,
    /// Live delay feed, re-read every `delay_refresh`.
    pub delays: Option<PathBuf>,
    /// Live bike count feed, re-read every `bike_refresh`.
    pub bikes: Option<PathBuf>,
    pub delay_refresh: Duration,
    pub bike_refresh: Duration,
    pub cache: CacheConfig,
}

impl ServerConfig {
    pub fn new(feed: impl Into<PathBuf>) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            feed: feed.into(),
            delays: None,
            bikes: None,
            delay_refresh: Duration::from_secs(DEFAULT_DELAY_REFRESH_SECS),
            bike_refresh: Duration::from_secs(DEFAULT_BIKE_REFRESH_SECS),
            cache: CacheConfig::default(),
        }
    }

    /// Read `ROUTER_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let feed = lookup("ROUTER_FEED").ok_or(ConfigError::Missing("ROUTER_FEED"))?;
        let mut config = Self::new(feed);

        let addr = lookup("ROUTER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        config.addr = parse("ROUTER_ADDR", addr)?;
        config.delays = lookup("ROUTER_DELAYS").map(PathBuf::from);
        config.bikes = lookup("ROUTER_BIKES").map(PathBuf::from);

        if let Some(v) = lookup("ROUTER_DELAY_REFRESH_SECS") {
            config.delay_refresh = Duration::from_secs(parse_positive("ROUTER_DELAY_REFRESH_SECS", v)?);
        }
        if let Some(v) = lookup("ROUTER_BIKE_REFRESH_SECS") {
            config.bike_refresh = Duration::from_secs(parse_positive("ROUTER_BIKE_REFRESH_SECS", v)?);
        }
        if let Some(v) = lookup("ROUTER_CACHE_TTL_SECS") {
            config.cache.ttl = Duration::from_secs(parse("ROUTER_CACHE_TTL_SECS", v)?);
        }
        if let Some(v) = lookup("ROUTER_CACHE_CAPACITY") {
            config.cache.max_capacity = parse("ROUTER_CACHE_CAPACITY", v)?;
        }
        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid { var, value })
}

// tokio intervals panic on a zero period
fn parse_positive(var: &'static str, value: String) -> Result<u64, ConfigError> {
    match parse::<u64>(var, value.clone())? {
        0 => Err(ConfigError::Invalid { var, value }),
        n => Ok(n),
    }
}
