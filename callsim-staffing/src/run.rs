//! Single simulation runs

use crate::params::{SimulationParams, Workload};
use crate::validation::Validate;
use callsim_components::{CallCenter, CallCenterEvent};
use callsim_core::{
    simulation_span, Executor, SimError, SimTime, Simulation, SimulationConfig,
};
use callsim_metrics::RunOutcome;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

/// Simulate one call center with the given number of agents up to the
/// horizon and reduce the customers that finished.
///
/// # Errors
///
/// Malformed parameters are rejected before anything runs. A run in which
/// nobody is served is not an error: it yields [`RunOutcome::NoCompletions`].
pub fn run_simulation(params: &SimulationParams) -> Result<RunOutcome, SimError> {
    params.validate()?;
    simulate(&params.workload, params.num_servers, params.seed)
}

/// Run without re-validating; callers have checked `workload` already.
pub(crate) fn simulate(
    workload: &Workload,
    num_servers: usize,
    seed: Option<u64>,
) -> Result<RunOutcome, SimError> {
    let span = simulation_span("call_center", num_servers, seed);
    let _guard = span.enter();

    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut sim = Simulation::new(SimulationConfig {
        seed: seed.unwrap_or_default(),
    });

    let center = CallCenter::new(workload.call_center_config(num_servers), rng)?;
    let key = sim.add_component(center);
    sim.schedule(SimTime::zero(), key, CallCenterEvent::Open);
    let horizon = SimTime::from_minutes(workload.horizon_minutes);
    sim.execute(Executor::timed(horizon));

    let center = sim
        .remove_component::<CallCenterEvent, CallCenter>(key)
        .ok_or_else(|| SimError::ComponentNotFound {
            id: key.id().to_string(),
        })?;
    let outcome = center
        .close(horizon)
        .finalize(&workload.run_context(num_servers))?;

    match &outcome {
        RunOutcome::Completed(summary) => debug!(
            served = summary.total_served,
            abandoned = summary.total_abandoned,
            blocked = summary.total_blocked,
            pct_within_sla = summary.pct_within_sla,
            utilization_pct = summary.utilization_pct,
            "Run finished"
        ),
        RunOutcome::NoCompletions(result) => debug!(
            arrivals = result.total_arrivals,
            "Run finished with no completed service"
        ),
    }
    Ok(outcome)
}
