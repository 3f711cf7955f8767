//! Custom error types for translation operations

use thiserror::Error;

use crate::core::models::Provider;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslateError {
    /// Connection failure or request timeout
    #[error("Network error: {message}")]
    Network {
        message: String,
    },

    /// Non-success status or structured error payload from a provider
    #[error("Provider error ({provider}): {status} - {message}")]
    Provider {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Response body did not have the expected JSON shape
    #[error("Parse failure ({provider}): {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },

    /// Returned item count did not match the requested count
    #[error("Count mismatch: expected {expected} translations, got {actual}")]
    CountMismatch {
        expected: usize,
        actual: usize,
    },

    /// Batch exceeds a provider's hard item limit
    #[error("Batch of {len} items exceeds the {provider} limit of {limit}")]
    BatchTooLarge {
        provider: &'static str,
        limit: usize,
        len: usize,
    },

    /// All backends disabled or misconfigured
    #[error("No translation provider is enabled")]
    NoProviderAvailable,

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TranslateError {
    /// Network-level failure from a reqwest error, keeping timeouts distinct
    /// in the message so logs stay diagnosable.
    pub fn from_request(provider: Provider, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("[{provider}] request timed out: {err}")
        } else {
            format!("[{provider}] {err}")
        };
        TranslateError::Network { message }
    }

    /// Whether the retry/fallback loop may recover from this error locally.
    /// `NoProviderAvailable` and configuration problems are terminal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TranslateError::Network { .. }
                | TranslateError::Provider { .. }
                | TranslateError::Parse { .. }
                | TranslateError::CountMismatch { .. }
                | TranslateError::BatchTooLarge { .. }
        )
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslateError>;
