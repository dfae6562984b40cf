//! Customer records and their lifecycle
//!
//! ```text
//! Arrived ──> Blocked
//!    │
//!    └──> Waiting ──> InService ──> Served
//!            │
//!            └──> Abandoned ──> (retrial: a new customer)
//! ```
//!
//! A retrial never revives the abandoned record. It creates a fresh customer
//! whose `retry_of` points back at the one that hung up.

use crate::error::TransitionError;
use callsim_core::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub u64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Customer({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerState {
    Arrived,
    Waiting,
    InService,
    Served,
    Abandoned,
    Blocked,
}

impl CustomerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CustomerState::Served | CustomerState::Abandoned | CustomerState::Blocked
        )
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            CustomerState::Served => Some(Outcome::Served),
            CustomerState::Abandoned => Some(Outcome::Abandoned),
            CustomerState::Blocked => Some(Outcome::Blocked),
            _ => None,
        }
    }
}

impl fmt::Display for CustomerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CustomerState::Arrived => "arrived",
            CustomerState::Waiting => "waiting",
            CustomerState::InService => "in service",
            CustomerState::Served => "served",
            CustomerState::Abandoned => "abandoned",
            CustomerState::Blocked => "blocked",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Served,
    Abandoned,
    Blocked,
}

/// One caller, from arrival to a terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub arrival: SimTime,
    pub service_start: Option<SimTime>,
    pub service_end: Option<SimTime>,
    /// Time between arrival and grant (served) or giving up (abandoned).
    pub wait: Option<SimTime>,
    pub service_time: Option<SimTime>,
    /// The abandoned customer this one is a retrial of.
    pub retry_of: Option<CustomerId>,
    state: CustomerState,
}

impl Customer {
    pub fn new(id: CustomerId, arrival: SimTime) -> Self {
        Self {
            id,
            arrival,
            service_start: None,
            service_end: None,
            wait: None,
            service_time: None,
            retry_of: None,
            state: CustomerState::Arrived,
        }
    }

    pub fn retrial(id: CustomerId, arrival: SimTime, origin: CustomerId) -> Self {
        Self {
            retry_of: Some(origin),
            ..Self::new(id, arrival)
        }
    }

    pub fn state(&self) -> CustomerState {
        self.state
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.state.outcome()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn transition(
        &mut self,
        from: CustomerState,
        to: CustomerState,
        action: &'static str,
    ) -> Result<(), TransitionError> {
        if self.state != from {
            return Err(TransitionError {
                customer: self.id,
                state: self.state,
                action,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Turned away at arrival because the system was full.
    pub fn block(&mut self) -> Result<(), TransitionError> {
        self.transition(CustomerState::Arrived, CustomerState::Blocked, "be blocked")
    }

    /// Joined the wait list.
    pub fn wait_in_queue(&mut self) -> Result<(), TransitionError> {
        self.transition(CustomerState::Arrived, CustomerState::Waiting, "join the queue")
    }

    /// An agent picked up. Valid straight from arrival or after waiting.
    pub fn start_service(
        &mut self,
        now: SimTime,
        service_time: SimTime,
    ) -> Result<(), TransitionError> {
        let from = match self.state {
            CustomerState::Arrived | CustomerState::Waiting => self.state,
            state => {
                return Err(TransitionError {
                    customer: self.id,
                    state,
                    action: "start service",
                })
            }
        };
        self.transition(from, CustomerState::InService, "start service")?;
        self.service_start = Some(now);
        self.wait = Some(now.duration_since(self.arrival));
        self.service_time = Some(service_time);
        Ok(())
    }

    pub fn finish_service(&mut self, now: SimTime) -> Result<(), TransitionError> {
        self.transition(CustomerState::InService, CustomerState::Served, "finish service")?;
        self.service_end = Some(now);
        Ok(())
    }

    /// Gave up while waiting.
    pub fn abandon(&mut self, now: SimTime) -> Result<(), TransitionError> {
        self.transition(CustomerState::Waiting, CustomerState::Abandoned, "abandon")?;
        self.wait = Some(now.duration_since(self.arrival));
        Ok(())
    }
}
