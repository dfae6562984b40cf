//! Per-run customer statistics
//!
//! [`RunMetrics`] is filled in incrementally while a run executes, one call per
//! terminal customer, and reduced into a [`RunOutcome`] once the clock has
//! reached the horizon. Every outcome is also reported through the `metrics`
//! facade, which is a no-op unless the embedding application installs a
//! recorder.

use crate::error::MetricsError;
use hdrhistogram::Histogram as HdrHistogram;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SECONDS_PER_MINUTE: f64 = 60.0;

/// Static facts about a run that the reduction needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunContext {
    pub num_servers: usize,
    pub horizon_minutes: f64,
    pub sla_threshold_seconds: f64,
    pub sla_target_pct: f64,
    /// Arrival rate times mean service time.
    pub offered_load: f64,
}

/// Incremental statistics for one simulation run (times in minutes).
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    arrivals: u64,
    retrials: u64,
    blocked: u64,
    served_waits: Vec<f64>,
    abandoned_waits: Vec<f64>,
    service_times: Vec<f64>,
    /// Service already delivered to customers still in service at the horizon.
    unfinished_busy_minutes: f64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an arrival. Retrials count as arrivals too.
    pub fn record_arrival(&mut self, is_retrial: bool) {
        self.arrivals += 1;
        if is_retrial {
            self.retrials += 1;
            counter!("callsim_retrials_total").increment(1);
        }
        counter!("callsim_arrivals_total").increment(1);
    }

    pub fn record_served(&mut self, wait_minutes: f64, service_minutes: f64) {
        self.served_waits.push(wait_minutes.max(0.0));
        self.service_times.push(service_minutes.max(0.0));
        counter!("callsim_customers_total", "outcome" => "served").increment(1);
    }

    pub fn record_abandoned(&mut self, wait_minutes: f64) {
        self.abandoned_waits.push(wait_minutes.max(0.0));
        counter!("callsim_customers_total", "outcome" => "abandoned").increment(1);
    }

    /// Busy time of a service that was still running when the clock stopped.
    pub fn record_unfinished_service(&mut self, elapsed_minutes: f64) {
        if elapsed_minutes.is_finite() {
            self.unfinished_busy_minutes += elapsed_minutes.max(0.0);
        }
    }

    pub fn record_blocked(&mut self) {
        self.blocked += 1;
        counter!("callsim_customers_total", "outcome" => "blocked").increment(1);
    }

    pub fn arrivals(&self) -> u64 {
        self.arrivals
    }

    pub fn retrials(&self) -> u64 {
        self.retrials
    }

    pub fn served(&self) -> u64 {
        self.served_waits.len() as u64
    }

    pub fn abandoned(&self) -> u64 {
        self.abandoned_waits.len() as u64
    }

    pub fn blocked(&self) -> u64 {
        self.blocked
    }

    /// Customers that reached a terminal outcome.
    pub fn terminal(&self) -> u64 {
        self.served() + self.abandoned() + self.blocked
    }

    /// Reduce the collected samples into aggregate statistics.
    ///
    /// Runs in which nobody was served yield [`RunOutcome::NoCompletions`]
    /// instead of ratios over an empty sample.
    pub fn finalize(&self, context: &RunContext) -> Result<RunOutcome, MetricsError> {
        let served = self.served();
        let abandoned = self.abandoned();

        let busy_minutes = self.service_times.iter().sum::<f64>() + self.unfinished_busy_minutes;
        let capacity_minutes = context.num_servers as f64 * context.horizon_minutes;
        let utilization_pct = percentage(busy_minutes, capacity_minutes).min(100.0);
        let abandonment_rate = percentage(abandoned as f64, self.terminal() as f64);
        let avg_abandon_wait_seconds = mean(&self.abandoned_waits) * SECONDS_PER_MINUTE;

        if served == 0 {
            debug!(
                arrivals = self.arrivals,
                abandoned,
                blocked = self.blocked,
                "Run finished without a served customer"
            );
            return Ok(RunOutcome::NoCompletions(NoCompletions {
                num_servers: context.num_servers,
                horizon_minutes: context.horizon_minutes,
                total_arrivals: self.arrivals,
                total_abandoned: abandoned,
                total_blocked: self.blocked,
                avg_abandon_wait_seconds,
                abandonment_rate,
                utilization_pct,
            }));
        }

        let sla_threshold_minutes = context.sla_threshold_seconds / SECONDS_PER_MINUTE;
        let within_sla = self
            .served_waits
            .iter()
            .filter(|&&w| w <= sla_threshold_minutes)
            .count();
        let pct_within_sla = percentage(within_sla as f64, served as f64);

        let waits = WaitStats::from_minutes(&self.served_waits)?;

        Ok(RunOutcome::Completed(RunSummary {
            num_servers: context.num_servers,
            horizon_minutes: context.horizon_minutes,
            total_arrivals: self.arrivals,
            retrials: self.retrials,
            total_served: served,
            total_abandoned: abandoned,
            total_blocked: self.blocked,
            avg_wait_seconds: mean(&self.served_waits) * SECONDS_PER_MINUTE,
            avg_abandon_wait_seconds,
            avg_service_minutes: mean(&self.service_times),
            wait_p50_seconds: waits.p50_seconds,
            wait_p90_seconds: waits.p90_seconds,
            wait_p95_seconds: waits.p95_seconds,
            pct_within_sla,
            abandonment_rate,
            utilization_pct,
            offered_load_erlangs: context.offered_load,
            meets_sla: pct_within_sla >= context.sla_target_pct,
        }))
    }
}

/// Aggregate statistics of a run with at least one served customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub num_servers: usize,
    pub horizon_minutes: f64,
    pub total_arrivals: u64,
    pub retrials: u64,
    pub total_served: u64,
    pub total_abandoned: u64,
    pub total_blocked: u64,
    pub avg_wait_seconds: f64,
    pub avg_abandon_wait_seconds: f64,
    pub avg_service_minutes: f64,
    pub wait_p50_seconds: f64,
    pub wait_p90_seconds: f64,
    pub wait_p95_seconds: f64,
    pub pct_within_sla: f64,
    /// Abandoned customers as a percentage of served, abandoned and blocked.
    pub abandonment_rate: f64,
    /// Service time delivered by the horizon over `servers × horizon`, in
    /// percent. Includes the elapsed part of services still running.
    pub utilization_pct: f64,
    pub offered_load_erlangs: f64,
    pub meets_sla: bool,
}

/// A run in which no customer completed service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoCompletions {
    pub num_servers: usize,
    pub horizon_minutes: f64,
    pub total_arrivals: u64,
    pub total_abandoned: u64,
    pub total_blocked: u64,
    pub avg_abandon_wait_seconds: f64,
    pub abandonment_rate: f64,
    pub utilization_pct: f64,
}

/// Result of reducing one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(RunSummary),
    NoCompletions(NoCompletions),
}

impl RunOutcome {
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            RunOutcome::Completed(summary) => Some(summary),
            RunOutcome::NoCompletions(_) => None,
        }
    }

    pub fn into_summary(self) -> Option<RunSummary> {
        match self {
            RunOutcome::Completed(summary) => Some(summary),
            RunOutcome::NoCompletions(_) => None,
        }
    }

    /// Zero when nobody was served: no customer met the threshold.
    pub fn pct_within_sla(&self) -> f64 {
        self.summary().map_or(0.0, |s| s.pct_within_sla)
    }

    pub fn abandonment_rate(&self) -> f64 {
        match self {
            RunOutcome::Completed(summary) => summary.abandonment_rate,
            RunOutcome::NoCompletions(result) => result.abandonment_rate,
        }
    }

    pub fn utilization_pct(&self) -> f64 {
        match self {
            RunOutcome::Completed(summary) => summary.utilization_pct,
            RunOutcome::NoCompletions(result) => result.utilization_pct,
        }
    }

    /// Mean served wait; zero when nobody was served.
    pub fn avg_wait_seconds(&self) -> f64 {
        self.summary().map_or(0.0, |s| s.avg_wait_seconds)
    }
}

/// Served-wait percentiles computed with an HDR histogram at millisecond
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitStats {
    pub count: u64,
    pub p50_seconds: f64,
    pub p90_seconds: f64,
    pub p95_seconds: f64,
    pub max_seconds: f64,
}

impl WaitStats {
    pub fn from_minutes(waits: &[f64]) -> Result<Self, MetricsError> {
        let millis: Vec<u64> = waits
            .iter()
            .map(|&wait| (wait * SECONDS_PER_MINUTE * 1000.0).round().max(0.0) as u64)
            .collect();
        // 1ms to the longest wait, 3 significant figures
        let high = millis.iter().copied().max().unwrap_or_default().max(2);
        let mut hist = HdrHistogram::<u64>::new_with_bounds(1, high, 3)?;
        for &value in &millis {
            if let Err(e) = hist.record(value) {
                warn!("Failed to record wait in HDR histogram: {}", e);
            }
        }
        let seconds = |millis: u64| millis as f64 / 1000.0;
        Ok(Self {
            count: hist.len(),
            p50_seconds: seconds(hist.value_at_quantile(0.5)),
            p90_seconds: seconds(hist.value_at_quantile(0.9)),
            p95_seconds: seconds(hist.value_at_quantile(0.95)),
            max_seconds: seconds(hist.max()),
        })
    }
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
