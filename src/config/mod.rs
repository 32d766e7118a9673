//! # Configuration Management
//!
//! Environment-variable driven configuration for the certsync core. Every
//! setting has a default so the crate works out of the box against the public
//! authority endpoint.

use std::time::Duration;

use crate::services::RetryPolicy;
use crate::{Error, Result};

/// Default validation authority API base URL.
const DEFAULT_AUTHORITY_URL: &str = "https://api.ssllabs.com/api/v3";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the validation authority's analyze API.
    pub authority_url: String,
    /// Polling policy for validation runs.
    pub validation: ValidationConfig,
}

/// Validation workflow polling configuration
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub initial_delay_secs: u64,
    pub backoff_multiplier: f64,
    pub max_attempts: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            initial_delay_secs: policy.initial_delay.as_secs(),
            backoff_multiplier: policy.multiplier,
            max_attempts: policy.max_attempts,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            validation: ValidationConfig::default(),
        }
    }
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let authority_url = std::env::var("CERTSYNC_AUTHORITY_URL")
            .unwrap_or_else(|_| DEFAULT_AUTHORITY_URL.to_string());

        let defaults = ValidationConfig::default();
        let initial_delay_secs = parse_var(
            "CERTSYNC_VALIDATION_INITIAL_DELAY_SECS",
            defaults.initial_delay_secs,
        )?;
        let backoff_multiplier =
            parse_var("CERTSYNC_VALIDATION_BACKOFF_MULTIPLIER", defaults.backoff_multiplier)?;
        let max_attempts = parse_var("CERTSYNC_VALIDATION_MAX_ATTEMPTS", defaults.max_attempts)?;

        if max_attempts == 0 {
            return Err(Error::config("CERTSYNC_VALIDATION_MAX_ATTEMPTS must be at least 1"));
        }

        Ok(Self {
            authority_url,
            validation: ValidationConfig { initial_delay_secs, backoff_multiplier, max_attempts },
        })
    }

    /// The retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_secs(self.validation.initial_delay_secs),
            multiplier: self.validation.backoff_multiplier,
            max_attempts: self.validation.max_attempts,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
