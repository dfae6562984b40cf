//! JSON export of run and search results
//!
//! Every result type in the workspace derives `Serialize`, so the same two
//! helpers cover single runs, replication averages and optimizer output.

use crate::error::MetricsError;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Serialize a result to a JSON string.
pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, MetricsError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }?;
    Ok(json)
}

/// Export a result to a JSON file
///
/// # Example
/// ```no_run
/// use callsim_metrics::{export_json, RunContext, RunMetrics};
///
/// let metrics = RunMetrics::new();
/// // ... record customers while the run executes ...
/// let context = RunContext {
///     num_servers: 12,
///     horizon_minutes: 1000.0,
///     sla_threshold_seconds: 20.0,
///     sla_target_pct: 80.0,
///     offered_load: 8.35,
/// };
/// let outcome = metrics.finalize(&context).unwrap();
/// export_json(&outcome, "results/run.json", true).unwrap();
/// ```
pub fn export_json<T: Serialize + ?Sized>(
    value: &T,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), MetricsError> {
    let json = to_json(value, pretty)?;
    let mut file = File::create(path.as_ref())?;
    file.write_all(json.as_bytes())?;
    Ok(())
}
