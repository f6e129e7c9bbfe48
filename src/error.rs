//! Error types for the token stats service

use thiserror::Error;

/// Errors that can occur when fetching stats from the remote feed
///
/// Cloneable so a single in-flight fetch can hand the same outcome to every
/// caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Non-2xx HTTP response
    #[error("Remote fetch failed: HTTP {status} {status_text}")]
    RemoteFetch { status: u16, status_text: String },

    /// The endpoint rejected our credentials (401/403)
    #[error("Unauthorized: HTTP {status}, check the configured API key")]
    Unauthorized { status: u16 },

    /// Body could not be parsed or did not report success
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transport level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,

    /// Invalid configuration detected at construction time
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Creates a RemoteFetch error from a status code
    pub fn remote(status: reqwest::StatusCode) -> Self {
        Self::RemoteFetch {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// Creates an InvalidResponse error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether retrying the same request could succeed
    ///
    /// Credential and configuration problems will fail identically on every
    /// attempt, so the query controller gives up on them immediately.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProviderError::Unauthorized { .. } | ProviderError::Configuration(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_builder() {
            ProviderError::Configuration(err.to_string())
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Errors recorded by the query controller
///
/// These never escape the controller's public operations; consumers only see
/// the rendered message.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// Every attempt failed and no cached snapshot was available
    #[error("Failed to load token stats after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        attempts: u32,
        last_error: ProviderError,
    },

    /// The failure is not worth retrying
    #[error("{0}")]
    NotRetryable(ProviderError),
}
