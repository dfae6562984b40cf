//! Error types for the simulation framework

use thiserror::Error;

/// Top-level error type for simulation operations
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Component not found with ID: {id}")]
    ComponentNotFound { id: String },

    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl SimError {
    /// Shorthand for a [`SimError::Configuration`] built from anything displayable.
    pub fn configuration(message: impl Into<String>) -> Self {
        SimError::Configuration(message.into())
    }
}

/// Errors raised while resolving a service time specification into a
/// samplable distribution.
///
/// The service time sampler recovers from these by falling back to an
/// exponential law and keeps the error as its fallback reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("{family}: {parameter} must be {constraint}, got {value}")]
    InvalidParameter {
        family: &'static str,
        parameter: &'static str,
        constraint: &'static str,
        value: f64,
    },

    #[error("mean service time must be positive and finite, got {0}")]
    InvalidMean(f64),
}
