use std::any::Any;
use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::rc::Rc;
use tracing::trace;
use uuid::Uuid;

use crate::types::{EventId, EventPriority};
use crate::{Key, SimTime};

/// Entry type stored in the scheduler, including the event value, component key, and the time when
/// it is supposed to occur.
///
/// Besides being stored in the scheduler's internal priority queue,
/// event entries are simply passed to [`crate::Components`] object, which unpacks them, and passes them
/// to the correct component.
#[derive(Debug)]
pub struct EventEntry {
    event_id: EventId,
    time: SimTime,
    priority: EventPriority,
    pub(crate) component: Uuid,
    inner: Box<dyn Any>,
}

impl EventEntry {
    pub(crate) fn new<E: fmt::Debug + 'static>(
        id: EventId,
        time: SimTime,
        priority: EventPriority,
        component: Key<E>,
        event: E,
    ) -> Self {
        EventEntry {
            event_id: id,
            time,
            priority,
            component: component.id,
            inner: Box::new(event),
        }
    }

    pub fn id(&self) -> EventId {
        self.event_id
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn priority(&self) -> EventPriority {
        self.priority
    }

    /// Tries to downcast the event entry to one holding an event of type `E`.
    /// If fails, returns `None`.
    #[must_use]
    pub fn downcast<E: fmt::Debug + 'static>(&self) -> Option<EventEntryTyped<'_, E>> {
        self.inner.downcast_ref::<E>().map(|event| EventEntryTyped {
            id: self.event_id,
            time: self.time,
            component_key: Key::new_with_id(self.component),
            event,
        })
    }

    fn sort_key(&self) -> (SimTime, EventPriority, EventId) {
        (self.time, self.priority, self.event_id)
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse the ordering for min-heap behavior in BinaryHeap
        other.sort_key().cmp(&self.sort_key())
    }
}

#[derive(Debug)]
pub struct EventEntryTyped<'e, E: fmt::Debug> {
    pub id: EventId,
    pub time: SimTime,
    pub component_key: Key<E>,
    pub event: &'e E,
}

type Clock = Rc<Cell<SimTime>>;

/// This struct exposes only immutable access to the simulation clock.
/// The clock itself is owned by the scheduler, while others can obtain `ClockRef`
/// to read the current simulation time.
///
/// # Example
///
/// ```
/// # use callsim_core::Scheduler;
/// let scheduler = Scheduler::default();
/// let clock_ref = scheduler.clock();
/// assert_eq!(clock_ref.time(), scheduler.time());
/// ```
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock.get()
    }
}

/// Scheduler is used to keep the current time and information about the upcoming events.
///
/// Events are ordered by `(time, priority, id)`. Cancellation is lazy: a cancelled
/// entry stays in the heap until it surfaces and is then discarded.
///
/// See the [crate-level documentation](index.html) for more information.
pub struct Scheduler {
    next_event_id: u64,
    events: BinaryHeap<EventEntry>,
    pending: HashSet<EventId>,
    clock: Clock,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            next_event_id: 0,
            events: BinaryHeap::default(),
            pending: HashSet::new(),
            clock: Rc::new(Cell::new(SimTime::default())),
        }
    }
}

impl Scheduler {
    /// Schedules `event` to be executed for `component` at `self.time() + delay`.
    pub fn schedule<E: fmt::Debug + 'static>(
        &mut self,
        delay: SimTime,
        component: Key<E>,
        event: E,
    ) -> EventId {
        self.schedule_with_priority(delay, EventPriority::Normal, component, event)
    }

    /// Schedules `event` with an explicit dispatch class.
    pub fn schedule_with_priority<E: fmt::Debug + 'static>(
        &mut self,
        delay: SimTime,
        priority: EventPriority,
        component: Key<E>,
        event: E,
    ) -> EventId {
        self.next_event_id += 1;
        let id = EventId(self.next_event_id);
        let time = self.time() + delay;
        trace!(event_id = %id, time = %time, %priority, "Event scheduled");
        self.events
            .push(EventEntry::new(id, time, priority, component, event));
        self.pending.insert(id);
        id
    }

    /// Withdraws a pending event. Returns `false` if the event already fired
    /// or was cancelled before.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.pending.remove(&id);
        if removed {
            trace!(event_id = %id, "Event cancelled");
        }
        removed
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Number of events that are scheduled and not cancelled.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Returns a reference to the next live event or `None` if none are left.
    pub fn peek(&mut self) -> Option<&EventEntry> {
        self.discard_cancelled();
        self.events.peek()
    }

    /// Removes and returns the next live event, advancing the clock to its time.
    pub fn pop(&mut self) -> Option<EventEntry> {
        self.discard_cancelled();
        let event = self.events.pop()?;
        self.pending.remove(&event.id());
        self.clock.replace(event.time());
        Some(event)
    }

    fn discard_cancelled(&mut self) {
        while self
            .events
            .peek()
            .is_some_and(|top| !self.pending.contains(&top.id()))
        {
            self.events.pop();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clock_ref() {
        let time = SimTime::from_secs(1);
        let clock = Clock::new(Cell::new(time));
        let clock_ref = ClockRef::from(clock);
        assert_eq!(clock_ref.time(), time);
    }

    #[test]
    fn test_event_entry_downcast() {
        let key = Key::<String>::new_with_id(Uuid::from_u128(1));
        let entry = EventEntry::new(
            EventId(0),
            SimTime::from_secs(1),
            EventPriority::Normal,
            key,
            String::from("inner"),
        );
        assert!(entry.downcast::<String>().is_some());
        assert!(entry.downcast::<i32>().is_none());
    }

    #[test]
    fn test_event_entry_cmp() {
        let key = Key::<()>::new_with_id(Uuid::from_u128(1));
        let make = |id: u64, secs: u64, priority: EventPriority| {
            EventEntry::new(EventId(id), SimTime::from_secs(secs), priority, key, ())
        };

        // Earlier time sorts as "greater" for the max-heap.
        assert_eq!(
            make(3, 0, EventPriority::Normal).cmp(&make(1, 1, EventPriority::Normal)),
            Ordering::Greater
        );
        // Same time: normal before late regardless of id.
        assert_eq!(
            make(9, 1, EventPriority::Normal).cmp(&make(1, 1, EventPriority::Late)),
            Ordering::Greater
        );
        // Same time and class: creation order.
        assert_eq!(
            make(1, 1, EventPriority::Normal).cmp(&make(2, 1, EventPriority::Normal)),
            Ordering::Greater
        );
    }

    #[derive(Debug, Clone, Eq, PartialEq)]
    struct EventA;
    #[derive(Debug, Clone, Eq, PartialEq)]
    struct EventB;

    #[test]
    fn test_scheduler() {
        let mut scheduler = Scheduler::default();
        assert_eq!(scheduler.time(), SimTime::zero());
        assert!(scheduler.events.is_empty());

        let component_a = Key::<EventA>::new_with_id(Uuid::from_u128(1));
        let component_b = Key::<EventB>::new_with_id(Uuid::from_u128(2));

        scheduler.schedule(SimTime::from_secs(1), component_a, EventA);
        scheduler.schedule(SimTime::zero(), component_b, EventB);
        scheduler.schedule(SimTime::from_secs(2), component_b, EventB);
        assert_eq!(scheduler.pending_events(), 3);

        let entry = scheduler.pop().unwrap();
        let entry = entry.downcast::<EventB>().unwrap();
        assert_eq!(entry.time, SimTime::zero());
        assert_eq!(entry.component_key.id(), component_b.id());
        assert_eq!(entry.event, &EventB);

        let entry = scheduler.pop().unwrap();
        let entry = entry.downcast::<EventA>().unwrap();
        assert_eq!(entry.time, SimTime::from_secs(1));
        assert_eq!(scheduler.time(), SimTime::from_secs(1));
        assert_eq!(scheduler.clock().time(), SimTime::from_secs(1));

        let entry = scheduler.pop().unwrap();
        assert!(entry.downcast::<EventB>().is_some());
        assert_eq!(scheduler.time(), SimTime::from_secs(2));

        assert!(scheduler.pop().is_none());
        assert_eq!(scheduler.pending_events(), 0);
    }

    #[test]
    fn test_same_time_events_dispatch_in_creation_order() {
        let mut scheduler = Scheduler::default();
        let key = Key::<usize>::new_with_id(Uuid::from_u128(1));
        for i in 0..100 {
            scheduler.schedule(SimTime::from_secs(5), key, i);
        }
        let order: Vec<usize> = std::iter::from_fn(|| scheduler.pop())
            .map(|e| *e.downcast::<usize>().unwrap().event)
            .collect();
        assert_eq!(order, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_late_events_follow_normal_events_at_same_time() {
        let mut scheduler = Scheduler::default();
        let key = Key::<&'static str>::new_with_id(Uuid::from_u128(1));
        scheduler.schedule_with_priority(SimTime::from_secs(1), EventPriority::Late, key, "timeout");
        scheduler.schedule(SimTime::from_secs(1), key, "grant");

        let first = scheduler.pop().unwrap();
        assert_eq!(*first.downcast::<&str>().unwrap().event, "grant");
        let second = scheduler.pop().unwrap();
        assert_eq!(*second.downcast::<&str>().unwrap().event, "timeout");
    }

    #[test]
    fn test_cancelled_events_never_dispatch() {
        let mut scheduler = Scheduler::default();
        let key = Key::<u32>::new_with_id(Uuid::from_u128(1));
        let first = scheduler.schedule(SimTime::from_secs(1), key, 1);
        scheduler.schedule(SimTime::from_secs(2), key, 2);

        assert!(scheduler.cancel(first));
        assert!(!scheduler.cancel(first));
        assert_eq!(scheduler.pending_events(), 1);

        assert_eq!(scheduler.peek().map(|e| e.time()), Some(SimTime::from_secs(2)));
        let entry = scheduler.pop().unwrap();
        assert_eq!(*entry.downcast::<u32>().unwrap().event, 2);
        assert!(scheduler.pop().is_none());
    }

    #[test]
    fn test_cancel_after_dispatch_is_noop() {
        let mut scheduler = Scheduler::default();
        let key = Key::<u32>::new_with_id(Uuid::from_u128(1));
        let id = scheduler.schedule(SimTime::zero(), key, 7);
        assert!(scheduler.pop().is_some());
        assert!(!scheduler.cancel(id));
    }
}
