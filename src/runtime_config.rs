//! # Runtime Configuration Module
//!
//! Environment-derived defaults consumed by routers and the Postman synchronizer.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Used for |
//! |---|---|---|
//! | `API_URL` | `localhost` | host shown in synchronized request URLs |
//! | `API_PORT` | unset | port shown in synchronized request URLs |
//! | `API_PROTOCOL` | `https` | protocol shown in synchronized request URLs |
//! | `POSTMAN_API_URL` | `https://api.getpostman.com` | Postman API base URL |
//! | `POSTMAN_TIMEOUT_SECS` | unset | request timeout for Postman calls |
//!
//! `API_URL` may also carry a protocol and port (`http://api.local:8080`);
//! explicit `API_PROTOCOL` / `API_PORT` win over the parsed parts.
//!
//! ## Usage
//!
//! ```rust
//! use apirouter::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("documenting routes on {}", config.host);
//! ```

use std::env;
use std::time::Duration;

pub const DEFAULT_POSTMAN_API_URL: &str = "https://api.getpostman.com";

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
    pub postman_api_url: String,
    pub postman_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            protocol: "https".to_string(),
            host: "localhost".to_string(),
            port: None,
            postman_api_url: DEFAULT_POSTMAN_API_URL.to_string(),
            postman_timeout: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RuntimeConfig::default();

        if let Some(api_url) = lookup("API_URL").filter(|s| !s.trim().is_empty()) {
            let (protocol, host, port) = split_api_url(api_url.trim());
            if let Some(protocol) = protocol {
                config.protocol = protocol;
            }
            config.host = host;
            config.port = port;
        }
        if let Some(protocol) = lookup("API_PROTOCOL").filter(|s| !s.is_empty()) {
            config.protocol = protocol.trim_end_matches("://").to_string();
        }
        if let Some(port) = lookup("API_PORT").and_then(|s| s.trim().parse().ok()) {
            config.port = Some(port);
        }
        if let Some(url) = lookup("POSTMAN_API_URL").filter(|s| !s.is_empty()) {
            config.postman_api_url = url.trim_end_matches('/').to_string();
        }
        config.postman_timeout = lookup("POSTMAN_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        config
    }
}

/// Split `[protocol://]host[:port][/...]` into its parts.
fn split_api_url(raw: &str) -> (Option<String>, String, Option<u16>) {
    let (protocol, rest) = match raw.split_once("://") {
        Some((p, rest)) => (Some(p.to_string()), rest),
        None => (None, raw),
    };
    let authority = rest.split('/').next().unwrap_or(rest);
    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (protocol, host.to_string(), Some(port)),
            Err(_) => (protocol, authority.to_string(), None),
        },
        None => (protocol, authority.to_string(), None),
    }
}
