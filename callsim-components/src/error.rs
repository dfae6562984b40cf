//! Error types for simulation components

use crate::customer::{CustomerId, CustomerState};
use callsim_core::SimError;
use thiserror::Error;

/// Errors related to component operations
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Invalid component configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<ComponentError> for SimError {
    fn from(error: ComponentError) -> Self {
        match error {
            ComponentError::InvalidConfiguration(message) => SimError::Configuration(message),
        }
    }
}

/// A customer was asked to make a move its state machine does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{customer} cannot {action} while {state}")]
pub struct TransitionError {
    pub customer: CustomerId,
    pub state: CustomerState,
    pub action: &'static str,
}
