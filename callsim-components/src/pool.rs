//! Counted resource pool with a FIFO wait list
//!
//! The pool models the agents of a call center: a fixed number of identical
//! units, handed out first come, first served. A request that cannot be granted
//! immediately is queued and identified by a [`RequestToken`], which the
//! requester can use to withdraw the request if it gives up first.

use crate::error::ComponentError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{trace, warn};

/// Handle to a queued acquisition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request({})", self.0)
    }
}

/// Result of [`ResourcePool::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// A unit was handed out immediately.
    Granted,
    /// The request waits in line; the token withdraws it.
    Queued(RequestToken),
}

/// Fixed-capacity pool of identical units.
///
/// Invariant: `in_use <= capacity`, and requests only wait while every unit is
/// in use.
#[derive(Debug, Clone)]
pub struct ResourcePool<R> {
    capacity: usize,
    in_use: usize,
    waiting: VecDeque<(RequestToken, R)>,
    next_token: u64,
    /// Total number of grants (for metrics)
    total_granted: u64,
    /// Total number of withdrawn requests (for metrics)
    total_cancelled: u64,
}

impl<R> ResourcePool<R> {
    /// Create a pool with `capacity` units.
    ///
    /// # Errors
    ///
    /// A pool needs at least one unit.
    pub fn new(capacity: usize) -> Result<Self, ComponentError> {
        if capacity == 0 {
            return Err(ComponentError::InvalidConfiguration(
                "resource pool capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            in_use: 0,
            waiting: VecDeque::new(),
            next_token: 0,
            total_granted: 0,
            total_cancelled: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn available(&self) -> usize {
        self.capacity - self.in_use
    }

    /// Number of requests waiting for a unit.
    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn total_granted(&self) -> u64 {
        self.total_granted
    }

    pub fn total_cancelled(&self) -> u64 {
        self.total_cancelled
    }

    /// Request a unit for `requester`.
    ///
    /// Granted at once when a unit is free and nobody is waiting; otherwise the
    /// request joins the back of the wait list.
    pub fn acquire(&mut self, requester: R) -> Acquire {
        if self.in_use < self.capacity && self.waiting.is_empty() {
            self.in_use += 1;
            self.total_granted += 1;
            trace!(in_use = self.in_use, capacity = self.capacity, "Unit granted");
            return Acquire::Granted;
        }

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        self.waiting.push_back((token, requester));
        trace!(%token, queue_len = self.waiting.len(), "Request queued");
        Acquire::Queued(token)
    }

    /// Return a unit to the pool.
    ///
    /// If someone is waiting the unit passes straight to the head of the wait
    /// list and that requester is returned; the occupied count is unchanged.
    pub fn release(&mut self) -> Option<R> {
        if self.in_use == 0 {
            warn!("Release on an idle resource pool ignored");
            return None;
        }

        match self.waiting.pop_front() {
            Some((token, requester)) => {
                self.total_granted += 1;
                trace!(%token, queue_len = self.waiting.len(), "Unit handed to waiting request");
                Some(requester)
            }
            None => {
                self.in_use -= 1;
                trace!(in_use = self.in_use, "Unit returned");
                None
            }
        }
    }

    /// Withdraw a queued request.
    ///
    /// Returns the requester, or `None` if the token was already granted or
    /// withdrawn.
    pub fn cancel(&mut self, token: RequestToken) -> Option<R> {
        let position = self.waiting.iter().position(|(t, _)| *t == token)?;
        let (_, requester) = self.waiting.remove(position)?;
        self.total_cancelled += 1;
        trace!(%token, queue_len = self.waiting.len(), "Request withdrawn");
        Some(requester)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(ResourcePool::<u32>::new(0).is_err());
    }

    #[test]
    fn test_grants_until_full_then_queues() {
        let mut pool = ResourcePool::new(2).unwrap();
        assert_eq!(pool.acquire("a"), Acquire::Granted);
        assert_eq!(pool.acquire("b"), Acquire::Granted);
        assert!(matches!(pool.acquire("c"), Acquire::Queued(_)));
        assert_eq!(pool.in_use(), 2);
        assert_eq!(pool.queue_len(), 1);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_release_hands_over_in_fifo_order() {
        let mut pool = ResourcePool::new(1).unwrap();
        pool.acquire(0);
        for i in 1..=3 {
            pool.acquire(i);
        }
        assert_eq!(pool.release(), Some(1));
        assert_eq!(pool.release(), Some(2));
        assert_eq!(pool.release(), Some(3));
        assert_eq!(pool.in_use(), 1);
        assert_eq!(pool.release(), None);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.total_granted(), 4);
    }

    #[test]
    fn test_cancelled_request_is_never_granted() {
        let mut pool = ResourcePool::new(1).unwrap();
        pool.acquire("busy");
        let Acquire::Queued(first) = pool.acquire("gives-up") else {
            panic!("expected queued request");
        };
        pool.acquire("stays");

        assert_eq!(pool.cancel(first), Some("gives-up"));
        assert_eq!(pool.cancel(first), None);
        assert_eq!(pool.release(), Some("stays"));
        assert_eq!(pool.total_cancelled(), 1);
    }

    #[test]
    fn test_release_on_idle_pool_is_ignored() {
        let mut pool = ResourcePool::<u8>::new(3).unwrap();
        assert_eq!(pool.release(), None);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_occupancy_invariant_under_random_operations() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let capacity = rng.gen_range(1..6);
            let mut pool = ResourcePool::new(capacity).unwrap();
            let mut queued = Vec::new();
            let mut next = 0u32;

            for _ in 0..2_000 {
                match rng.gen_range(0..3) {
                    0 => {
                        next += 1;
                        if let Acquire::Queued(token) = pool.acquire(next) {
                            queued.push(token);
                        }
                    }
                    1 => {
                        pool.release();
                    }
                    _ if !queued.is_empty() => {
                        let token = queued.swap_remove(rng.gen_range(0..queued.len()));
                        pool.cancel(token);
                    }
                    _ => {}
                }

                assert!(pool.in_use() <= pool.capacity());
                if pool.queue_len() > 0 {
                    assert_eq!(pool.in_use(), pool.capacity());
                }
            }
        }
    }
}
