//! Application configuration loaded from environment variables.
//!
//! Fail-fast: required variables must be present and valid or the process
//! exits with a clear error message.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Runtime configuration for the ops API server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub http_addr: SocketAddr,
    /// Log filter directive (e.g. "info,tabula_comp_leave=debug").
    pub log_filter: String,
    /// Shared HS256 secret for platform tokens.
    pub auth_token_secret: String,
    /// Whether the in-app expiry scheduler loop runs.
    pub expiry_job_enabled: bool,
    /// Seconds between scheduled expiry runs.
    pub expiry_job_poll_interval_secs: u64,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let auth_token_secret = env::var("AUTH_TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingVar("AUTH_TOKEN_SECRET".to_string()))?;
        if auth_token_secret.len() < 32 {
            return Err(ConfigError::InvalidValue {
                var: "AUTH_TOKEN_SECRET".to_string(),
                message: "must be at least 32 characters".to_string(),
            });
        }

        let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let http_addr: SocketAddr = http_addr.parse().map_err(|e| ConfigError::InvalidValue {
            var: "HTTP_ADDR".to_string(),
            message: format!("{e}"),
        })?;

        let log_filter = env::var("LOG_FILTER").unwrap_or_else(|_| "info".to_string());

        let expiry_job_enabled = match env::var("EXPIRY_JOB_ENABLED") {
            Ok(value) => parse_bool("EXPIRY_JOB_ENABLED", &value)?,
            Err(_) => true,
        };

        let expiry_job_poll_interval_secs = match env::var("EXPIRY_JOB_POLL_INTERVAL_SECS") {
            Ok(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
                var: "EXPIRY_JOB_POLL_INTERVAL_SECS".to_string(),
                message: format!("{e}"),
            })?,
            Err(_) => tabula_api_leave::DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            database_url,
            http_addr,
            log_filter,
            auth_token_secret,
            expiry_job_enabled,
            expiry_job_poll_interval_secs,
        })
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}
