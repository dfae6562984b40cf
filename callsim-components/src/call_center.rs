//! Call-center component
//!
//! A single [`CallCenter`] component hosts the arrival generator and every
//! customer actor of one run. Actors are plain [`Customer`] state machines that
//! advance when one of their events is dispatched; the component owns the agent
//! pool, the run's random number generator and its [`RunMetrics`].
//!
//! A waiting customer races the pool against up to two timeouts (patience and
//! abandonment). Timeouts are scheduled with [`EventPriority::Late`], so a grant
//! and a timeout at the same instant resolve in favour of the grant. Whichever
//! side loses is withdrawn explicitly: the queued pool request on a timeout,
//! the pending timeout events on a grant.

use crate::customer::{Customer, CustomerId, CustomerState};
use crate::pool::{Acquire, RequestToken, ResourcePool};
use callsim_core::dists::PoissonArrivals;
use callsim_core::{
    Component, EventId, EventPriority, Key, Scheduler, ServiceTimeSampler, ServiceTimeSpec,
    SimError, SimTime,
};
use callsim_metrics::RunMetrics;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Default delay before an abandoned caller tries again.
pub const DEFAULT_RETRIAL_DELAY_MINUTES: f64 = 5.0;

/// Everything that shapes the customer flow of one run (times in minutes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallCenterConfig {
    /// Poisson arrival rate, customers per minute.
    pub arrival_rate: f64,
    pub service: ServiceTimeSpec,
    pub num_servers: usize,
    /// System-level deadline after which a waiting customer leaves.
    pub abandonment_minutes: Option<f64>,
    /// Per-customer patience.
    pub patience_minutes: Option<f64>,
    /// Chance, in percent, that an abandoned customer calls back.
    pub retrial_rate_pct: Option<f64>,
    pub retrial_delay_minutes: f64,
    /// Customers in the system (waiting plus in service) above which arrivals
    /// are blocked.
    pub max_capacity: Option<usize>,
}

impl CallCenterConfig {
    pub fn new(arrival_rate: f64, service: ServiceTimeSpec, num_servers: usize) -> Self {
        Self {
            arrival_rate,
            service,
            num_servers,
            abandonment_minutes: None,
            patience_minutes: None,
            retrial_rate_pct: None,
            retrial_delay_minutes: DEFAULT_RETRIAL_DELAY_MINUTES,
            max_capacity: None,
        }
    }

    /// Configured timeouts that are actually enabled.
    fn timeouts(&self) -> impl Iterator<Item = (TimeoutKind, f64)> {
        [
            (TimeoutKind::Patience, self.patience_minutes),
            (TimeoutKind::Abandonment, self.abandonment_minutes),
        ]
        .into_iter()
        .filter_map(|(kind, minutes)| minutes.filter(|m| *m > 0.0).map(|m| (kind, m)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    Patience,
    Abandonment,
}

/// Events handled by [`CallCenter`]
#[derive(Debug, Clone)]
pub enum CallCenterEvent {
    /// Start the arrival process.
    Open,
    /// A fresh caller arrives; the next arrival is scheduled.
    Arrival,
    /// A waiting customer's timeout fired.
    Timeout {
        customer: CustomerId,
        kind: TimeoutKind,
    },
    /// An agent finished with a customer.
    ServiceComplete { customer: CustomerId },
    /// An abandoned customer calls back as a new customer.
    Retrial { origin: CustomerId },
}

/// The losing sides of a waiting customer's race, kept so they can be
/// withdrawn.
#[derive(Debug)]
struct PendingRequest {
    token: RequestToken,
    timeouts: Vec<EventId>,
}

pub struct CallCenter {
    config: CallCenterConfig,
    rng: StdRng,
    arrivals: PoissonArrivals,
    sampler: ServiceTimeSampler,
    pool: ResourcePool<CustomerId>,
    /// Customers that have not reached a terminal state.
    active: HashMap<CustomerId, Customer>,
    pending: HashMap<CustomerId, PendingRequest>,
    next_customer: u64,
    metrics: RunMetrics,
    history: Option<Vec<Customer>>,
}

impl CallCenter {
    /// Build the component for one run.
    ///
    /// Invalid service-time shape parameters degrade to an exponential law
    /// here, once, with a warning.
    pub fn new(config: CallCenterConfig, rng: StdRng) -> Result<Self, SimError> {
        let arrivals = PoissonArrivals::new(config.arrival_rate)?;
        let sampler = ServiceTimeSampler::new(config.service.clone())?;
        let pool = ResourcePool::new(config.num_servers)?;
        Ok(Self {
            config,
            rng,
            arrivals,
            sampler,
            pool,
            active: HashMap::new(),
            pending: HashMap::new(),
            next_customer: 0,
            metrics: RunMetrics::new(),
            history: None,
        })
    }

    /// Keep every terminal customer record instead of discarding it once it
    /// has been counted.
    pub fn with_history(mut self) -> Self {
        self.history = Some(Vec::new());
        self
    }

    pub fn config(&self) -> &CallCenterConfig {
        &self.config
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> RunMetrics {
        self.metrics
    }

    /// Stop the run at `horizon` and hand over its metrics, crediting the
    /// busy time that services still in progress accumulated by then.
    pub fn close(mut self, horizon: SimTime) -> RunMetrics {
        for customer in self.active.values() {
            if customer.state() != CustomerState::InService {
                continue;
            }
            let (Some(start), Some(service)) = (customer.service_start, customer.service_time)
            else {
                continue;
            };
            let elapsed = horizon.duration_since(start).min(service);
            self.metrics.record_unfinished_service(elapsed.as_minutes());
        }
        self.metrics
    }

    pub fn pool(&self) -> &ResourcePool<CustomerId> {
        &self.pool
    }

    pub fn sampler(&self) -> &ServiceTimeSampler {
        &self.sampler
    }

    /// Terminal customers, in the order they finished. Empty unless
    /// [`CallCenter::with_history`] was used.
    pub fn history(&self) -> &[Customer] {
        self.history.as_deref().unwrap_or(&[])
    }

    /// Customers still waiting or in service.
    pub fn customers_in_system(&self) -> usize {
        self.active.len()
    }

    fn schedule_next_arrival(&mut self, self_id: Key<CallCenterEvent>, scheduler: &mut Scheduler) {
        let gap = self.arrivals.next_arrival_time(&mut self.rng);
        scheduler.schedule(gap, self_id, CallCenterEvent::Arrival);
    }

    fn admit(
        &mut self,
        retry_of: Option<CustomerId>,
        self_id: Key<CallCenterEvent>,
        scheduler: &mut Scheduler,
    ) {
        self.next_customer += 1;
        let id = CustomerId(self.next_customer);
        let now = scheduler.time();
        let mut customer = match retry_of {
            Some(origin) => Customer::retrial(id, now, origin),
            None => Customer::new(id, now),
        };
        self.metrics.record_arrival(retry_of.is_some());

        let in_system = self.pool.queue_len() + self.pool.in_use();
        if self.config.max_capacity.is_some_and(|max| in_system >= max) {
            trace!(customer = %id, in_system, "Customer blocked");
            if let Err(e) = customer.block() {
                warn!(error = %e, "Illegal customer transition");
            }
            self.metrics.record_blocked();
            self.archive(customer);
            return;
        }

        match self.pool.acquire(id) {
            Acquire::Granted => {
                self.active.insert(id, customer);
                self.begin_service(id, self_id, scheduler);
            }
            Acquire::Queued(token) => {
                if let Err(e) = customer.wait_in_queue() {
                    warn!(error = %e, "Illegal customer transition");
                }
                let timeouts = self
                    .config
                    .timeouts()
                    .map(|(kind, minutes)| {
                        scheduler.schedule_with_priority(
                            SimTime::from_minutes(minutes),
                            EventPriority::Late,
                            self_id,
                            CallCenterEvent::Timeout { customer: id, kind },
                        )
                    })
                    .collect();
                trace!(customer = %id, %token, queue_len = self.pool.queue_len(), "Customer waiting");
                self.pending.insert(id, PendingRequest { token, timeouts });
                self.active.insert(id, customer);
            }
        }
    }

    fn begin_service(
        &mut self,
        id: CustomerId,
        self_id: Key<CallCenterEvent>,
        scheduler: &mut Scheduler,
    ) {
        let Some(customer) = self.active.get_mut(&id) else {
            warn!(customer = %id, "Granted unit to unknown customer");
            return;
        };
        let service_time = self.sampler.sample_time(&mut self.rng);
        let now = scheduler.time();
        if let Err(e) = customer.start_service(now, service_time) {
            warn!(error = %e, "Illegal customer transition");
            return;
        }
        trace!(customer = %id, %service_time, "Service started");
        scheduler.schedule(service_time, self_id, CallCenterEvent::ServiceComplete { customer: id });
    }

    fn complete_service(
        &mut self,
        id: CustomerId,
        self_id: Key<CallCenterEvent>,
        scheduler: &mut Scheduler,
    ) {
        let Some(mut customer) = self.active.remove(&id) else {
            warn!(customer = %id, "Service completed for unknown customer");
            return;
        };
        match customer.finish_service(scheduler.time()) {
            Ok(()) => {
                let wait = customer.wait.unwrap_or_default().as_minutes();
                let service = customer.service_time.unwrap_or_default().as_minutes();
                self.metrics.record_served(wait, service);
                trace!(customer = %id, wait_minutes = wait, "Customer served");
                self.archive(customer);
            }
            Err(e) => warn!(error = %e, "Illegal customer transition"),
        }

        if let Some(next) = self.pool.release() {
            self.withdraw_timeouts(next, scheduler);
            self.begin_service(next, self_id, scheduler);
        }
    }

    /// The waiting customer got a unit: its timeouts lost the race.
    fn withdraw_timeouts(&mut self, id: CustomerId, scheduler: &mut Scheduler) {
        if let Some(pending) = self.pending.remove(&id) {
            for timeout in pending.timeouts {
                scheduler.cancel(timeout);
            }
        }
    }

    fn handle_timeout(
        &mut self,
        id: CustomerId,
        kind: TimeoutKind,
        self_id: Key<CallCenterEvent>,
        scheduler: &mut Scheduler,
    ) {
        // A granted customer has its timeouts cancelled, so a surviving timeout
        // always belongs to a waiting customer.
        let Some(pending) = self.pending.remove(&id) else {
            debug!(customer = %id, ?kind, "Timeout for customer no longer waiting");
            return;
        };
        for timeout in pending.timeouts {
            scheduler.cancel(timeout);
        }
        self.pool.cancel(pending.token);

        let Some(mut customer) = self.active.remove(&id) else {
            warn!(customer = %id, "Timeout for unknown customer");
            return;
        };
        let now = scheduler.time();
        if let Err(e) = customer.abandon(now) {
            warn!(error = %e, "Illegal customer transition");
            return;
        }
        let wait = customer.wait.unwrap_or_default().as_minutes();
        self.metrics.record_abandoned(wait);
        trace!(customer = %id, ?kind, wait_minutes = wait, "Customer abandoned");
        self.archive(customer);

        if self.should_retry() {
            let delay = SimTime::from_minutes(self.config.retrial_delay_minutes);
            trace!(customer = %id, %delay, "Retrial scheduled");
            scheduler.schedule(delay, self_id, CallCenterEvent::Retrial { origin: id });
        }
    }

    fn should_retry(&mut self) -> bool {
        match self.config.retrial_rate_pct {
            Some(rate) if rate > 0.0 => self.rng.gen::<f64>() < rate / 100.0,
            _ => false,
        }
    }

    fn archive(&mut self, customer: Customer) {
        debug_assert!(customer.is_terminal(), "archived {} while {}", customer.id, customer.state());
        if let Some(history) = self.history.as_mut() {
            history.push(customer);
        }
    }
}

impl Component for CallCenter {
    type Event = CallCenterEvent;

    fn process_event(
        &mut self,
        self_id: Key<Self::Event>,
        event: &Self::Event,
        scheduler: &mut Scheduler,
    ) {
        match event {
            CallCenterEvent::Open => {
                debug!(
                    servers = self.config.num_servers,
                    arrival_rate = self.config.arrival_rate,
                    "Call center open"
                );
                self.schedule_next_arrival(self_id, scheduler);
            }
            CallCenterEvent::Arrival => {
                self.admit(None, self_id, scheduler);
                self.schedule_next_arrival(self_id, scheduler);
            }
            CallCenterEvent::Timeout { customer, kind } => {
                self.handle_timeout(*customer, *kind, self_id, scheduler);
            }
            CallCenterEvent::ServiceComplete { customer } => {
                self.complete_service(*customer, self_id, scheduler);
            }
            CallCenterEvent::Retrial { origin } => {
                self.admit(Some(*origin), self_id, scheduler);
            }
        }
    }
}

impl std::fmt::Debug for CallCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallCenter")
            .field("servers", &self.pool.capacity())
            .field("in_use", &self.pool.in_use())
            .field("queue_len", &self.pool.queue_len())
            .field("customers_in_system", &self.active.len())
            .finish()
    }
}
