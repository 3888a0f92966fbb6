//! Controller configuration, read from environment variables.

use crate::error::ControllerError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace to watch (`None` watches all namespaces)
    pub namespace: Option<String>,
    /// Probe and metrics listen address
    pub metrics_addr: SocketAddr,
    /// Delay before retrying a request no host assignment could satisfy
    pub unschedulable_requeue: Duration,
    /// Error backoff floor in minutes
    pub backoff_min_minutes: u64,
    /// Error backoff ceiling in minutes
    pub backoff_max_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            unschedulable_requeue: Duration::from_secs(60),
            backoff_min_minutes: 1,
            backoff_max_minutes: 10,
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variables
    ///
    /// Unset or empty variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            namespace: get("WATCH_NAMESPACE"),
            metrics_addr: parse(&get, "METRICS_ADDR")?.unwrap_or(defaults.metrics_addr),
            unschedulable_requeue: parse::<u64>(&get, "UNSCHEDULABLE_REQUEUE_SECONDS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.unschedulable_requeue),
            backoff_min_minutes: parse(&get, "BACKOFF_MIN_MINUTES")?.unwrap_or(defaults.backoff_min_minutes),
            backoff_max_minutes: parse(&get, "BACKOFF_MAX_MINUTES")?.unwrap_or(defaults.backoff_max_minutes),
        };

        if config.backoff_min_minutes == 0 {
            return Err(ControllerError::InvalidConfig(
                "BACKOFF_MIN_MINUTES must be at least 1".to_string(),
            ));
        }
        if config.backoff_max_minutes < config.backoff_min_minutes {
            return Err(ControllerError::InvalidConfig(format!(
                "BACKOFF_MAX_MINUTES ({}) is below BACKOFF_MIN_MINUTES ({})",
                config.backoff_max_minutes, config.backoff_min_minutes
            )));
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ControllerError>
where
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| ControllerError::InvalidConfig(format!("{}={}: {}", key, raw, e)))
        })
        .transpose()
}
