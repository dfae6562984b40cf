//! Averaging across independent replications of the same configuration

use crate::run_metrics::RunOutcome;
use serde::{Deserialize, Serialize};

/// Means of the headline statistics over every replication.
///
/// A replication that served nobody still counts: it met the service level
/// for none of its customers, so it contributes 0% to the SLA mean, and its
/// abandonment rate and utilization are averaged like any other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplicationAverages {
    pub replications: usize,
    /// Replications that served at least one customer.
    pub completed_replications: usize,
    pub avg_sla_percentage: f64,
    pub avg_abandonment_rate: f64,
    pub avg_utilization: f64,
    pub avg_wait_seconds: f64,
}

impl ReplicationAverages {
    /// Returns `None` when there is nothing to average.
    pub fn from_outcomes<'a, I>(outcomes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a RunOutcome>,
    {
        let mut n = 0usize;
        let mut completed = 0usize;
        let mut totals = [0.0f64; 4];
        for outcome in outcomes {
            n += 1;
            if outcome.summary().is_some() {
                completed += 1;
            }
            totals[0] += outcome.pct_within_sla();
            totals[1] += outcome.abandonment_rate();
            totals[2] += outcome.utilization_pct();
            totals[3] += outcome.avg_wait_seconds();
        }
        if n == 0 {
            return None;
        }
        let count = n as f64;
        Some(Self {
            replications: n,
            completed_replications: completed,
            avg_sla_percentage: totals[0] / count,
            avg_abandonment_rate: totals[1] / count,
            avg_utilization: totals[2] / count,
            avg_wait_seconds: totals[3] / count,
        })
    }

    pub fn meets_sla(&self, target_pct: f64) -> bool {
        self.avg_sla_percentage >= target_pct
    }

    /// A missing ceiling is always met.
    pub fn meets_abandonment_target(&self, ceiling_pct: Option<f64>) -> bool {
        ceiling_pct.map_or(true, |ceiling| self.avg_abandonment_rate <= ceiling)
    }
}
