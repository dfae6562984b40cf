//! Run loop that drives a [`Simulation`] up to a horizon.

use crate::{SimTime, Simulation};
use tracing::trace;

/// Simulation execution trait.
pub trait Execute {
    /// Executes the simulation until the executor's stopping condition holds.
    fn execute(self, sim: &mut Simulation);
}

/// Dispatches events in order until the next one lies beyond the horizon.
///
/// Events scheduled exactly at the horizon are still dispatched; anything
/// later stays pending. The clock never moves past the last dispatched event,
/// so a later executor with a further horizon resumes where this one stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    horizon: SimTime,
}

impl Executor {
    #[must_use]
    pub fn timed(horizon: SimTime) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> SimTime {
        self.horizon
    }
}

impl Execute for Executor {
    fn execute(self, sim: &mut Simulation) {
        while sim.scheduler.peek().is_some_and(|e| e.time() <= self.horizon) {
            if !sim.step() {
                break;
            }
        }
        trace!(horizon = %self.horizon, now = %sim.time(), "Horizon reached");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Component, Key, Scheduler};

    /// Ticks every two seconds, ten times.
    struct Ticker {
        counter: usize,
    }

    #[derive(Debug)]
    struct Tick;

    impl Component for Ticker {
        type Event = Tick;

        fn process_event(
            &mut self,
            self_id: Key<Self::Event>,
            _event: &Self::Event,
            scheduler: &mut Scheduler,
        ) {
            self.counter += 1;
            if self.counter < 10 {
                scheduler.schedule(SimTime::from_secs(2), self_id, Tick);
            }
        }
    }

    fn ticking() -> (Simulation, Key<Tick>) {
        let mut sim = Simulation::default();
        let key = sim.add_component(Ticker { counter: 0 });
        sim.schedule(SimTime::zero(), key, Tick);
        (sim, key)
    }

    #[test]
    fn test_event_at_horizon_is_dispatched() {
        let (mut sim, key) = ticking();
        Executor::timed(SimTime::from_secs(6)).execute(&mut sim);
        let c: Ticker = sim.remove_component(key).unwrap();
        assert_eq!(c.counter, 4);
        assert_eq!(sim.time(), SimTime::from_secs(6));
    }

    #[test]
    fn test_clock_stops_at_last_event_before_horizon() {
        let (mut sim, key) = ticking();
        Executor::timed(SimTime::from_secs(5)).execute(&mut sim);
        assert_eq!(sim.time(), SimTime::from_secs(4));
        assert!(sim.has_pending_events());
        let c: Ticker = sim.remove_component(key).unwrap();
        assert_eq!(c.counter, 3);
    }

    #[test]
    fn test_later_horizon_resumes() {
        let (mut sim, key) = ticking();
        Executor::timed(SimTime::from_secs(5)).execute(&mut sim);
        Executor::timed(SimTime::from_secs(100)).execute(&mut sim);
        assert!(!sim.has_pending_events());
        assert_eq!(sim.events_processed(), 10);
        let c: Ticker = sim.remove_component(key).unwrap();
        assert_eq!(c.counter, 10);
    }

    #[test]
    fn test_empty_queue_returns_immediately() {
        let mut sim = Simulation::default();
        Executor::timed(SimTime::from_secs(10)).execute(&mut sim);
        assert_eq!(sim.time(), SimTime::zero());
        assert_eq!(Executor::timed(SimTime::from_secs(3)).horizon(), SimTime::from_secs(3));
    }
}
