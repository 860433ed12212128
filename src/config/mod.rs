//! Configuration management for the fraud detection service
//!
//! Loads settings from environment variables (and a `.env` file when present),
//! with support for different environments (development, staging, production).

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

use crate::store::ExpiryPolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Interface the listener binds to
    pub bind_address: IpAddr,

    /// Velocity store connection URL, always with a scheme
    pub redis_url: String,

    /// Upper bound on any single velocity store call
    pub store_timeout: Duration,

    /// How velocity window TTLs behave on repeated writes
    pub velocity_expiry: ExpiryPolicy,

    /// Whole-request timeout applied at the router
    pub request_timeout: Duration,

    /// CORS allowed origins, comma separated. Unset allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|s| Environment::from_str(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let bind_address = lookup("BIND_ADDRESS")
            .unwrap_or_else(|| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .map_err(|_| {
                ConfigError::InvalidValue("BIND_ADDRESS must be an IP address".to_string())
            })?;

        // Production must name its velocity store; elsewhere localhost is assumed
        let redis_url = match lookup("REDIS_URL") {
            Some(url) => normalize_redis_url(&url),
            None if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("REDIS_URL".to_string()))
            }
            None => "redis://localhost:6379".to_string(),
        };

        let store_timeout_ms = lookup("STORE_TIMEOUT_MS")
            .unwrap_or_else(|| "250".to_string())
            .parse::<u64>()
            .unwrap_or(250);

        let velocity_expiry = match lookup("VELOCITY_EXPIRY_POLICY") {
            Some(raw) => ExpiryPolicy::from_str(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "Invalid velocity expiry policy: '{}'. Expected: refresh or fixed",
                    raw
                ))
            })?,
            None => ExpiryPolicy::default(),
        };

        let request_timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u64>()
            .unwrap_or(10);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").filter(|s| !s.trim().is_empty());

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Config {
            environment,
            port,
            bind_address,
            redis_url,
            store_timeout: Duration::from_millis(store_timeout_ms),
            velocity_expiry,
            request_timeout: Duration::from_secs(request_timeout_secs),
            cors_allowed_origins,
            log_level,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Redis URL with any password masked, for logging
    pub fn redis_url_masked(&self) -> String {
        let userinfo_start = self.redis_url.find("://").map(|p| p + 3).unwrap_or(0);
        if let Some(at_pos) = self.redis_url.rfind('@') {
            if let Some(colon_pos) = self.redis_url[..at_pos].rfind(':') {
                if colon_pos >= userinfo_start {
                    let prefix = &self.redis_url[..colon_pos + 1];
                    let suffix = &self.redis_url[at_pos..];
                    return format!("{}****{}", prefix, suffix);
                }
            }
        }
        self.redis_url.clone()
    }
}

/// Accepts a bare `host:port` as well as a full `redis://` URL
pub fn normalize_redis_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("redis://{}", raw)
    }
}
