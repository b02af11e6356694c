//! Environment configuration

use crate::transport::DEFAULT_RECONNECT_DELAY;
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/ws";

const ENDPOINT_VAR: &str = "AGENT_LINK_URL";
const RECONNECT_VAR: &str = "AGENT_LINK_RECONNECT_MS";
const LOG_FORMAT_VAR: &str = "AGENT_LINK_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid endpoint {value:?}: {reason}")]
    InvalidEndpoint { value: String, reason: String },
    #[error("Invalid {var} value {value:?}: expected milliseconds")]
    InvalidDelay { var: &'static str, value: String },
    #[error("Invalid {var} value {value:?}: expected \"json\" or \"pretty\"")]
    InvalidLogFormat { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Url,
    pub reconnect_delay: Duration,
    pub log_format: LogFormat,
}

impl Config {
    /// Read the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first variable that does not parse
    /// or that fails [`Config::validate`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let endpoint = var(ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = parse_endpoint(endpoint.trim())?;

        let reconnect_delay = match var(RECONNECT_VAR) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidDelay {
                    var: RECONNECT_VAR,
                    value,
                })?,
            None => DEFAULT_RECONNECT_DELAY,
        };

        let log_format = match var(LOG_FORMAT_VAR) {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::InvalidLogFormat {
                        var: LOG_FORMAT_VAR,
                        value,
                    })
                }
            },
            None => LogFormat::default(),
        };

        let config = Self {
            endpoint,
            reconnect_delay,
            log_format,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Rejects endpoints that are not `ws`/`wss` URLs with a host, and a zero
    /// reconnect delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme = self.endpoint.scheme();
        if !matches!(scheme, "ws" | "wss") {
            return Err(ConfigError::InvalidEndpoint {
                value: self.endpoint.to_string(),
                reason: format!("unsupported scheme {scheme:?}, expected ws or wss"),
            });
        }
        if self.endpoint.host_str().is_none() {
            return Err(ConfigError::InvalidEndpoint {
                value: self.endpoint.to_string(),
                reason: "missing host".to_string(),
            });
        }
        if self.reconnect_delay.is_zero() {
            return Err(ConfigError::InvalidDelay {
                var: RECONNECT_VAR,
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_endpoint(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEndpoint {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
