//! Server configuration from the environment.

use axum::http::HeaderValue;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

pub const HOST_VAR: &str = "SKETCHFLOW_HOST";
pub const PORT_VAR: &str = "PORT";
pub const ALLOWED_ORIGINS_VAR: &str = "SKETCHFLOW_ALLOWED_ORIGINS";

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var} `{value}`: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<HeaderValue>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Read `SKETCHFLOW_HOST`, `PORT` and `SKETCHFLOW_ALLOWED_ORIGINS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source. Unset or blank variables
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(value) = get(HOST_VAR) {
            config.host = value.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: HOST_VAR,
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Some(value) = get(PORT_VAR) {
            config.port = value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                var: PORT_VAR,
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Some(value) = get(ALLOWED_ORIGINS_VAR) {
            config.allowed_origins = value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(|origin| {
                    HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                        var: ALLOWED_ORIGINS_VAR,
                        value: origin.to_string(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
