//! Call-center staffing estimation
//!
//! Two entry points sit on top of the simulation engine:
//!
//! - [`run_simulation`] simulates one call center with a fixed number of agents.
//! - [`find_minimum_agents`] searches for the fewest agents that meet a
//!   service-level target, averaging several independent replications per
//!   candidate.
//!
//! ```rust,no_run
//! use callsim_staffing::{find_minimum_agents, OptimizerParams, SearchResult};
//!
//! let result = find_minimum_agents(&OptimizerParams::default()).unwrap();
//! if let SearchResult::Found(found) = result {
//!     println!("{} agents", found.minimum_agents);
//! }
//! ```
//!
//! Both return plain `Serialize` types, ready to be rendered as JSON.

pub mod optimizer;
pub mod params;
pub mod run;
pub mod validation;

pub use optimizer::{find_minimum_agents, SearchExhausted, SearchResult, StaffingRecommendation};
pub use params::{OptimizerParams, SimulationParams, Workload};
pub use run::run_simulation;
pub use validation::{Validate, ValidationError};

pub use callsim_core::{ServiceDistribution, ServiceTimeSpec, SimError};
pub use callsim_metrics::{NoCompletions, RunOutcome, RunSummary};
