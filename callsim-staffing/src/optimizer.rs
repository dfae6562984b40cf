//! Minimum-staffing search
//!
//! Server counts are swept in ascending order. Each candidate is simulated
//! `num_replications` times and accepted when the averaged service level meets
//! the target and, if a ceiling is set, the averaged abandonment rate stays at
//! or below it. The first accepted count is the answer.

use crate::params::OptimizerParams;
use crate::run::simulate;
use crate::validation::Validate;
use callsim_core::ids::replication_seed;
use callsim_core::logging::replication_span;
use callsim_core::SimError;
use callsim_metrics::{ReplicationAverages, RunOutcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// The smallest staffing level that met every target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffingRecommendation {
    pub minimum_agents: usize,
    pub avg_sla_percentage: f64,
    pub avg_abandonment_rate: f64,
    pub avg_utilization: f64,
    pub avg_wait_seconds: f64,
    pub meets_sla: bool,
    pub meets_abandonment_target: bool,
    pub traffic_intensity: f64,
    pub theoretical_min: usize,
    /// Replications that served at least one customer. The others are
    /// averaged as 0% within the service level.
    pub completed_replications: usize,
    pub replication_results: Vec<RunOutcome>,
}

/// No count in the searched range met the targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchExhausted {
    pub message: String,
    pub min_agents: usize,
    pub max_agents: usize,
    /// First count actually simulated.
    pub searched_from: usize,
    pub candidates_evaluated: usize,
    pub traffic_intensity: f64,
    pub theoretical_min: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchResult {
    Found(StaffingRecommendation),
    Exhausted(SearchExhausted),
}

impl SearchResult {
    pub fn minimum_agents(&self) -> Option<usize> {
        match self {
            SearchResult::Found(found) => Some(found.minimum_agents),
            SearchResult::Exhausted(_) => None,
        }
    }
}

/// One server count evaluated over all replications.
struct CandidateEvaluation {
    outcomes: Vec<RunOutcome>,
    averages: Option<ReplicationAverages>,
}

/// Find the fewest agents that meet the service-level and abandonment targets.
///
/// # Errors
///
/// Only malformed parameters fail; an unreachable target is reported as
/// [`SearchResult::Exhausted`].
#[instrument(skip(params), fields(min = params.min_agents, max = params.max_agents))]
pub fn find_minimum_agents(params: &OptimizerParams) -> Result<SearchResult, SimError> {
    params.validate()?;

    let workload = &params.workload;
    let traffic_intensity = workload.traffic_intensity();
    let theoretical_min = params.min_agents.max(workload.theoretical_floor());
    let start = if params.skip_to_floor {
        theoretical_min
    } else {
        params.min_agents
    };
    info!(
        traffic_intensity,
        theoretical_min,
        start,
        replications = params.num_replications,
        "Starting staffing search"
    );

    let mut candidates_evaluated = 0;
    for agents in start..=params.max_agents {
        let candidate = evaluate(params, agents)?;
        candidates_evaluated += 1;

        let Some(averages) = candidate.averages else {
            continue;
        };
        let meets_sla = averages.meets_sla(workload.sla_target_pct);
        let meets_abandonment_target =
            averages.meets_abandonment_target(params.max_abandonment_rate);
        debug!(
            agents,
            completed_replications = averages.completed_replications,
            avg_sla_percentage = averages.avg_sla_percentage,
            avg_abandonment_rate = averages.avg_abandonment_rate,
            meets_sla,
            meets_abandonment_target,
            "Candidate evaluated"
        );

        if meets_sla && meets_abandonment_target {
            info!(minimum_agents = agents, candidates_evaluated, "Staffing target met");
            return Ok(SearchResult::Found(StaffingRecommendation {
                minimum_agents: agents,
                avg_sla_percentage: averages.avg_sla_percentage,
                avg_abandonment_rate: averages.avg_abandonment_rate,
                avg_utilization: averages.avg_utilization,
                avg_wait_seconds: averages.avg_wait_seconds,
                meets_sla,
                meets_abandonment_target,
                traffic_intensity,
                theoretical_min,
                completed_replications: averages.completed_replications,
                replication_results: candidate.outcomes,
            }));
        }
    }

    info!(candidates_evaluated, "No staffing level in range met the targets");
    Ok(SearchResult::Exhausted(SearchExhausted {
        message: format!(
            "No solution found with {} or fewer agents",
            params.max_agents
        ),
        min_agents: params.min_agents,
        max_agents: params.max_agents,
        searched_from: start,
        candidates_evaluated,
        traffic_intensity,
        theoretical_min,
    }))
}

fn evaluate(params: &OptimizerParams, agents: usize) -> Result<CandidateEvaluation, SimError> {
    let mut outcomes = Vec::with_capacity(params.num_replications);
    for replication in 0..params.num_replications {
        let span = replication_span(agents, replication);
        let _guard = span.enter();
        let seed = params
            .seed
            .map(|base| replication_seed(base, replication as u64));
        let outcome = simulate(&params.workload, agents, seed)?;
        if outcome.summary().is_none() {
            debug!("Replication served nobody; counted as missing the service level");
        }
        outcomes.push(outcome);
    }
    let averages = ReplicationAverages::from_outcomes(&outcomes);
    Ok(CandidateEvaluation { outcomes, averages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Workload;
    use callsim_core::ServiceTimeSpec;

    fn quick(workload: Workload) -> OptimizerParams {
        OptimizerParams {
            workload: Workload {
                horizon_minutes: 300.0,
                ..workload
            },
            num_replications: 2,
            ..OptimizerParams::default()
        }
    }

    #[test]
    fn test_floor_above_range_is_exhausted_without_running() {
        let params = OptimizerParams {
            min_agents: 2,
            max_agents: 5,
            ..quick(Workload::default())
        };
        match find_minimum_agents(&params).unwrap() {
            SearchResult::Exhausted(result) => {
                assert_eq!(result.candidates_evaluated, 0);
                assert_eq!(result.theoretical_min, 9);
                assert_eq!(result.searched_from, 9);
            }
            found => panic!("unexpected {found:?}"),
        }
    }

    #[test]
    fn test_found_count_meets_targets() {
        let params = quick(Workload::default());
        let SearchResult::Found(found) = find_minimum_agents(&params).unwrap() else {
            panic!("default workload must be staffable within 50 agents");
        };
        assert!(found.minimum_agents >= found.theoretical_min);
        assert!(found.avg_sla_percentage >= 80.0);
        assert!(found.avg_abandonment_rate <= 15.0);
        assert!(found.meets_sla && found.meets_abandonment_target);
        assert_eq!(found.replication_results.len(), 2);
        assert!(found
            .replication_results
            .iter()
            .filter_map(RunOutcome::summary)
            .all(|r| r.num_servers == found.minimum_agents));
    }

    #[test]
    fn test_replications_that_serve_nobody_fail_the_candidate() {
        // Sparse traffic on a short horizon: most replications see no
        // completed service, which must drag the average below target.
        let workload = Workload {
            arrival_rate: 0.05,
            service: ServiceTimeSpec::deterministic(0.1),
            horizon_minutes: 10.0,
            sla_target_pct: 90.0,
            ..Workload::default()
        };
        for seed in 0..20 {
            let params = OptimizerParams {
                workload: workload.clone(),
                min_agents: 1,
                max_agents: 1,
                num_replications: 3,
                seed: Some(seed),
                ..OptimizerParams::default()
            };
            let result = find_minimum_agents(&params).unwrap();
            if let SearchResult::Found(found) = &result {
                assert_eq!(found.completed_replications, 3, "seed {seed}: {found:?}");
                assert!(found.avg_sla_percentage >= 90.0);
            }
        }
    }

    #[test]
    fn test_sweep_without_floor_skip_starts_at_min_agents() {
        let params = OptimizerParams {
            skip_to_floor: false,
            min_agents: 1,
            max_agents: 3,
            ..quick(Workload::default())
        };
        match find_minimum_agents(&params).unwrap() {
            SearchResult::Exhausted(result) => {
                assert_eq!(result.searched_from, 1);
                assert_eq!(result.candidates_evaluated, 3);
            }
            found => panic!("unexpected {found:?}"),
        }
    }
}
