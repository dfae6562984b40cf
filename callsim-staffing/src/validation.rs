//! Parameter validation helpers

use callsim_core::SimError;
use std::fmt::Display;

/// Validation result for parameter sets
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Errors that can occur while validating parameters
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' must be {constraint}")]
    ConstraintViolation { field: String, constraint: String },

    #[error("Inconsistent parameters: {0}")]
    Inconsistent(String),
}

impl From<ValidationError> for SimError {
    fn from(error: ValidationError) -> Self {
        SimError::Configuration(error.to_string())
    }
}

/// Parameter sets that can be checked before a run starts.
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

fn violation(field: &str, constraint: impl Into<String>) -> ValidationError {
    ValidationError::ConstraintViolation {
        field: field.to_string(),
        constraint: constraint.into(),
    }
}

/// Helper for validating numeric ranges (inclusive). NaN is out of range.
pub fn validate_range<T: PartialOrd + Display>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> ValidationResult<()> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(violation(field, format!("between {min} and {max}")))
    }
}

/// Helper for validating that a value is positive. NaN is not.
pub fn validate_positive<T: PartialOrd + Default + Display>(
    field: &str,
    value: T,
) -> ValidationResult<()> {
    if value > T::default() {
        Ok(())
    } else {
        Err(violation(field, "positive"))
    }
}

/// Helper for validating that a value is non-negative
pub fn validate_non_negative<T: PartialOrd + Default + Display>(
    field: &str,
    value: T,
) -> ValidationResult<()> {
    if value >= T::default() {
        Ok(())
    } else {
        Err(violation(field, "non-negative"))
    }
}

/// Helper for validating that a float is finite
pub fn validate_finite(field: &str, value: f64) -> ValidationResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(violation(field, "finite"))
    }
}
