//! Statistics for call-center simulation runs
//!
//! This crate collects per-customer outcomes during a run ([`RunMetrics`]),
//! reduces them into a [`RunOutcome`] after the horizon, and averages the
//! summaries of independent replications ([`ReplicationAverages`]).

pub mod error;
pub mod export;
pub mod recorder;
pub mod replication;
pub mod run_metrics;

pub use error::MetricsError;
pub use export::{export_json, to_json};
pub use recorder::CounterRecorder;
pub use replication::ReplicationAverages;
pub use run_metrics::{NoCompletions, RunContext, RunMetrics, RunOutcome, RunSummary, WaitStats};
