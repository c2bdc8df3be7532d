//! Error types for the tracing-backend client

use thiserror::Error;

/// Errors that can occur while querying the tracing backend
#[derive(Debug, Error)]
pub enum ApmError {
    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend returned a non-success status. Never retried here; the
    /// caller decides.
    #[error("Tracing request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for tracing-backend operations
pub type ApmResult<T> = Result<T, ApmError>;
