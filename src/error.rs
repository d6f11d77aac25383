use thiserror::Error;

/// Convenience type alias for Results with GatewayError
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the reviews gateway
///
/// Transport and storage failures are recoverable and are caught at the
/// worker loop boundary; configuration errors abort startup.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Upstream request error: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Upstream feed mismatch: {message}")]
    UpstreamSchema { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
