//! Core type definitions and newtypes for the simulation framework

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for events in the simulation.
///
/// Ids are handed out in scheduling order, so they double as the tie-breaker
/// for events that share a timestamp and priority class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.0)
    }
}

/// Dispatch class of an event within a single timestamp.
///
/// All `Normal` events at an instant are dispatched before any `Late` event at
/// the same instant. Timeouts that race a resource grant are scheduled `Late`,
/// so a grant and a timeout landing on the same instant resolve in favour of
/// the grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum EventPriority {
    #[default]
    Normal,
    Late,
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventPriority::Normal => write!(f, "normal"),
            EventPriority::Late => write!(f, "late"),
        }
    }
}
