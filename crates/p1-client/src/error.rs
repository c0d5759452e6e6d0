//! Error types for API client operations.

use thiserror::Error;

/// Result type for API client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the P1 data APIs.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the API token (HTTP 401). Never retried.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-200 status or a response body that does not match the expected shape
    #[error("unexpected server response: {0}")]
    Response(String),

    /// A post-processing cast of a result column failed
    #[error("cannot cast field `{field}` to {dtype}: {reason}")]
    Cast {
        /// Column that failed to cast
        field: String,
        /// Target data type
        dtype: String,
        /// Underlying cast failure
        reason: String,
    },

    /// A call argument failed validation (for example a malformed datetime)
    #[error("invalid argument: {0}")]
    Validation(String),

    /// A caller precondition was violated before any request was issued
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// DataFrame construction error
    #[error("table error: {0}")]
    Table(#[from] polars::prelude::PolarsError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The API token was not found in the environment
    #[error("API token not found in environment variable {0}")]
    MissingToken(String),
}
