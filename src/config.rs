//! Server configuration read from the environment.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::time::Duration;

use derivative::Derivative;
use governor::Quota;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_MESSAGE_RATE_LIMIT: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[derivative(Default(value = "IpAddr::from([0, 0, 0, 0])"))]
    pub host: IpAddr,
    #[derivative(Default(value = "DEFAULT_PORT"))]
    pub port: u16,
    /// Seconds between lobby statistics log lines.
    #[derivative(Default(value = "DEFAULT_STATS_INTERVAL_SECS"))]
    pub stats_interval_secs: u64,
    /// Inbound frames allowed per second on one connection.
    #[derivative(Default(value = "DEFAULT_MESSAGE_RATE_LIMIT"))]
    pub message_rate_limit: u32,
}

impl ServerConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();
        if let Some(host) = parse(&lookup, "HOST")? {
            config.host = host;
        }
        if let Some(port) = parse(&lookup, "PORT")? {
            config.port = port;
        }
        if let Some(secs) = parse(&lookup, "STATS_INTERVAL_SECS")? {
            config.stats_interval_secs = secs;
        }
        if let Some(limit) = parse(&lookup, "MESSAGE_RATE_LIMIT")? {
            config.message_rate_limit = limit;
        }

        if config.stats_interval_secs == 0 {
            return Err(ConfigError::Zero { key: "STATS_INTERVAL_SECS" });
        }
        if config.message_rate_limit == 0 {
            return Err(ConfigError::Zero { key: "MESSAGE_RATE_LIMIT" });
        }
        Ok(config)
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    /// Per-connection inbound quota.
    #[must_use]
    pub fn rate_quota(&self) -> Quota {
        let per_second = NonZeroU32::new(self.message_rate_limit).unwrap_or(nonzero_ext::nonzero!(1u32));
        Quota::per_second(per_second)
    }
}

fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> ConfigResult<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ConfigResult<ServerConfig> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(cfg.stats_interval(), Duration::from_secs(120));
        assert_eq!(cfg.message_rate_limit, 20);
    }

    #[test]
    fn overrides() {
        let cfg = config(&[("HOST", "127.0.0.1"), ("PORT", "9000"), ("MESSAGE_RATE_LIMIT", "5"), ("STATS_INTERVAL_SECS", " ")])
            .unwrap();
        assert_eq!(cfg.socket_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.message_rate_limit, 5);
        assert_eq!(cfg.stats_interval_secs, DEFAULT_STATS_INTERVAL_SECS);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(config(&[("PORT", "eighty")]), Err(ConfigError::InvalidValue { key: "PORT", .. })));
        assert!(matches!(config(&[("HOST", "localhost:1")]), Err(ConfigError::InvalidValue { key: "HOST", .. })));
        assert!(matches!(config(&[("MESSAGE_RATE_LIMIT", "0")]), Err(ConfigError::Zero { .. })));
    }
}
