//! Simulation components for call-center staffing models
//!
//! This crate provides the agent [`ResourcePool`], the [`Customer`] lifecycle
//! and the [`CallCenter`] component that generates arrivals and drives one
//! customer actor per caller.

pub mod call_center;
pub mod customer;
pub mod error;
pub mod pool;

pub use call_center::{
    CallCenter, CallCenterConfig, CallCenterEvent, TimeoutKind, DEFAULT_RETRIAL_DELAY_MINUTES,
};
pub use customer::{Customer, CustomerId, CustomerState, Outcome};
pub use error::{ComponentError, TransitionError};
pub use pool::{Acquire, RequestToken, ResourcePool};
