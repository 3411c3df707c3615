//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::combat::{ArenaRules, ProximityTap};
use crate::util::rate_limit::DEFAULT_ACTION_RATE_LIMIT;
use crate::util::time::DEFAULT_COMBAT_TPS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,

    /// Shared secret for internal request signatures and session tickets
    pub internal_shared_secret: String,
    /// Where combat resolutions are POSTed; logged only when unset
    pub strategy_callback_url: Option<String>,

    /// Scheduler frequency
    pub tick_rate_hz: u32,
    /// Combat time limit in seconds, 0 disables it
    pub time_limit_secs: u64,
    pub proximity_tap_enabled: bool,
    /// Max combat actions per second per connection
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origin: env::var("CLIENT_ORIGIN")
                .map_err(|_| ConfigError::Missing("CLIENT_ORIGIN"))?,

            internal_shared_secret: env::var("INTERNAL_SHARED_SECRET")
                .map_err(|_| ConfigError::Missing("INTERNAL_SHARED_SECRET"))?,
            strategy_callback_url: env::var("STRATEGY_CALLBACK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),

            tick_rate_hz: parse_or("COMBAT_TICK_RATE_HZ", DEFAULT_COMBAT_TPS)?,
            time_limit_secs: parse_or("COMBAT_TIME_LIMIT_SECS", 0)?,
            proximity_tap_enabled: parse_or("PROXIMITY_TAP_ENABLED", true)?,
            input_rate_limit: parse_or("INPUT_RATE_LIMIT", DEFAULT_ACTION_RATE_LIMIT)?,
        })
    }

    /// Rules every combat instance runs under
    pub fn arena_rules(&self) -> ArenaRules {
        ArenaRules {
            proximity_tap: self.proximity_tap_enabled.then(ProximityTap::default),
            time_limit_ms: (self.time_limit_secs > 0).then(|| self.time_limit_secs * 1000),
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
