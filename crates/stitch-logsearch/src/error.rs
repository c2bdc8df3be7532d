//! Error types for the log-search client

use thiserror::Error;

/// Errors that can occur while querying the log-search backend
#[derive(Debug, Error)]
pub enum LogSearchError {
    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend returned a non-success status. Never retried here; the
    /// caller decides.
    #[error("Log-search request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for log-search operations
pub type LogSearchResult<T> = Result<T, LogSearchError>;
