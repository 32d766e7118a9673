//! # Error Handling
//!
//! This module provides error handling for the certsync core using `thiserror`.
//! Adapter-level transport failures are carried unchanged so callers can decide
//! whether to drop a subscription or retry.

/// Custom result type for certsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the certsync core
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Bad input to create/update — caller must correct and retry
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced certificate has no persisted identity — stale local state,
    /// caller should re-sync
    #[error("Certificate not found: no persisted document for serial '{serial}'")]
    NotFound { serial: String },

    /// Remote role write rejected by the store
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Certificate link yields no usable domain
    #[error("Malformed link: {0}")]
    MalformedLink(String),

    /// Authority response missing expected structure
    #[error("Malformed analysis response: {0}")]
    MalformedAnalysis(String),

    /// A validation run is already in flight for this certificate
    #[error("Validation already in flight for serial '{0}'")]
    ValidationInFlight(String),

    /// Network transport errors (HTTP)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error for a certificate serial
    pub fn not_found<S: Into<String>>(serial: S) -> Self {
        Self::NotFound { serial: serial.into() }
    }

    /// Create a new permission error
    pub fn permission<S: Into<String>>(message: S) -> Self {
        Self::Permission(message.into())
    }

    /// Create a new malformed-link error
    pub fn malformed_link<S: Into<String>>(message: S) -> Self {
        Self::MalformedLink(message.into())
    }

    /// Create a new malformed-analysis error
    pub fn malformed_analysis<S: Into<String>>(message: S) -> Self {
        Self::MalformedAnalysis(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Check if the caller may reasonably retry the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::ValidationInFlight(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}
