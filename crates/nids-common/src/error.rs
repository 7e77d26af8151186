//! Error types shared across nids crates

use thiserror::Error;

/// Shared nids error type
#[derive(Error, Debug)]
pub enum NidsError {
    /// A counter was requested for an empty keyword
    #[error("invalid metric key: {0:?}")]
    InvalidMetricKey(String),
}

/// Result type for nids
pub type NidsResult<T> = Result<T, NidsError>;
