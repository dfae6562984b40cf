//! Error types for metrics collection and export

use callsim_core::SimError;
use thiserror::Error;

/// Errors related to metrics collection
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Histogram error: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<MetricsError> for SimError {
    fn from(error: MetricsError) -> Self {
        SimError::Metrics(error.to_string())
    }
}
