//! Core discrete event simulation engine for call-center staffing models.
//!
//! This crate provides the fundamental building blocks for discrete event simulation:
//! time management, event scheduling, component dispatch and service time sampling.
//!
//! # Architecture Overview
//!
//! - [`Simulation`]: owns the [`Scheduler`] and the registered components.
//!   Use this to add components, schedule their first events and run to a horizon.
//!
//! - [`Component`]: a state machine that reacts to its own typed events and may
//!   schedule (or cancel) further events through the scheduler.
//!
//! Everything runs on one thread. "Concurrent" actors are interleaved at event
//! boundaries, so there is no locking between them.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use callsim_core::{Simulation, SimulationConfig, SimTime, Executor};
//!
//! let mut simulation = Simulation::new(SimulationConfig { seed: 42 });
//! // add components and schedule their first events, then:
//! simulation.execute(Executor::timed(SimTime::from_minutes(1000.0)));
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], which represents simulation time (not wall-clock time).
//! This ensures deterministic, reproducible behavior across simulation runs.

pub mod dists;
pub mod error;
pub mod execute;
pub mod ids;
pub mod logging;
pub mod scheduler;
pub mod time;
pub mod types;

use std::any::Any;
use std::collections::HashMap;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

pub use dists::{ServiceDistribution, ServiceTimeSampler, ServiceTimeSpec};
pub use error::{DistributionError, SimError};
pub use execute::{Execute, Executor};
pub use logging::{init_simulation_logging, init_simulation_logging_with_level, simulation_span};
pub use scheduler::{ClockRef, EventEntry, Scheduler};
pub use time::SimTime;
pub use types::{EventId, EventPriority};

#[derive(Debug)]
pub struct Key<T> {
    id: Uuid,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Key<T> {
    pub fn new_with_id(id: Uuid) -> Self {
        Self {
            id,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the UUID of this key
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Key<T> {}

pub trait ProcessEventEntry: Any {
    fn process_event_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub trait Component: ProcessEventEntry {
    type Event: 'static;

    fn process_event(
        &mut self,
        self_id: Key<Self::Event>,
        event: &Self::Event,
        scheduler: &mut Scheduler,
    );
}

impl<E, C> ProcessEventEntry for C
where
    E: std::fmt::Debug + 'static,
    C: Component<Event = E> + 'static,
{
    fn process_event_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler) {
        match entry.downcast::<E>() {
            Some(typed) => self.process_event(typed.component_key, typed.event, scheduler),
            None => warn!(
                event_id = %entry.id(),
                expected = std::any::type_name::<E>(),
                "Dropping event with unexpected payload type"
            ),
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Container holding type-erased components.
pub struct Components {
    seed: u64,
    next_component: u64,
    components: HashMap<Uuid, Box<dyn ProcessEventEntry>>,
}

impl Components {
    fn new(seed: u64) -> Self {
        Self {
            seed,
            next_component: 0,
            components: HashMap::new(),
        }
    }

    /// Process the event on the component given by the event entry.
    pub fn process_event_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler) {
        match self.components.get_mut(&entry.component) {
            Some(component) => component.process_event_entry(entry, scheduler),
            None => debug!(
                event_id = %entry.id(),
                component_id = %entry.component,
                "Event addressed to a removed component"
            ),
        }
    }

    /// Registers a new component and returns its ID.
    #[must_use]
    pub fn register<E: std::fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> Key<E> {
        self.next_component += 1;
        let id = ids::deterministic_uuid(self.seed, ids::UUID_DOMAIN_COMPONENT, self.next_component);
        self.components.insert(id, Box::new(component));
        Key::new_with_id(id)
    }

    pub fn remove<E: 'static, C: Component<Event = E> + 'static>(&mut self, key: Key<E>) -> Option<C> {
        self.components.remove(&key.id).and_then(|boxed_trait| {
            let boxed_any: Box<dyn Any> = boxed_trait;
            boxed_any.downcast::<C>().ok().map(|boxed_c| *boxed_c)
        })
    }

    /// Get mutable access to a component
    pub fn get_component_mut<E: 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<&mut C> {
        self.components
            .get_mut(&key.id)
            .and_then(|boxed_trait| boxed_trait.as_any_mut().downcast_mut::<C>())
    }
}

/// Configuration shared by everything inside one simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Seed for deterministic component ids.
    pub seed: u64,
}

/// Simulation struct that puts different parts of the simulation together.
///
/// See the [crate-level documentation](index.html) for more information.
pub struct Simulation {
    scheduler: Scheduler,
    /// Component container.
    pub components: Components,
    events_processed: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            scheduler: Scheduler::default(),
            components: Components::new(config.seed),
            events_processed: 0,
        }
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.scheduler.time()
    }

    /// Number of events dispatched so far.
    #[must_use]
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Performs one step of the simulation. Returns `true` if there was in fact an event
    /// available to process, and `false` otherwise, which signifies that the simulation
    /// ended.
    pub fn step(&mut self) -> bool {
        let Some(event) = self.scheduler.pop() else {
            return false;
        };
        trace!(
            event_id = %event.id(),
            event_time = %event.time(),
            "Processing simulation step"
        );
        self.components
            .process_event_entry(event, &mut self.scheduler);
        self.events_processed += 1;
        true
    }

    /// Runs the entire simulation.
    ///
    /// The stopping condition and other execution details depend on the executor used.
    /// See [`Execute`] and [`Executor`] for more details.
    #[instrument(skip(self, executor), fields(initial_time = %self.time()))]
    pub fn execute<E: Execute>(&mut self, executor: E) {
        debug!("Starting simulation execution");
        executor.execute(self);
        info!(
            final_time = %self.time(),
            events_processed = self.events_processed,
            pending_events = self.scheduler.pending_events(),
            "Simulation execution completed"
        );
    }

    /// Adds a new component.
    #[must_use]
    #[instrument(skip(self, component), fields(component_type = std::any::type_name::<C>()))]
    pub fn add_component<E: std::fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> Key<E> {
        let key = self.components.register(component);
        debug!(component_id = %key.id(), "Added component to simulation");
        key
    }

    /// Remove a component: usually at the end of the simulation to peek at the state
    #[must_use]
    pub fn remove_component<E: std::fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<C> {
        let result = self.components.remove(key);
        if result.is_none() {
            warn!(component_id = %key.id(), "Attempted to remove non-existent component");
        }
        result
    }

    /// Get mutable access to a component
    pub fn get_component_mut<E: std::fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        key: Key<E>,
    ) -> Option<&mut C> {
        self.components.get_component_mut(key)
    }

    /// Schedules a new event to be executed `delay` from now in component `component`.
    pub fn schedule<E: std::fmt::Debug + 'static>(
        &mut self,
        delay: SimTime,
        component: Key<E>,
        event: E,
    ) -> EventId {
        self.scheduler.schedule(delay, component, event)
    }

    /// Returns the time of the next live event, or None if no events are scheduled.
    pub fn peek_next_event_time(&mut self) -> Option<SimTime> {
        self.scheduler.peek().map(|e| e.time())
    }

    /// Returns a ClockRef for reading the simulation time.
    pub fn clock(&self) -> ClockRef {
        self.scheduler.clock()
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        self.scheduler.pending_events() > 0
    }
}
