//! Single-flight admission for backend calls.
//!
//! A [`BusyGate`] hands out at most `capacity` [`BusyGuard`]s at a time.
//! Admission never waits: a caller that finds the gate full is told so and
//! must reject the work. Dropping the guard frees the slot, so the slot is
//! released on every exit path, including unwinding.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admission gate shared by everything that clones it.
#[derive(Debug, Clone)]
pub struct BusyGate {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// Proof of admission. The slot is held until this is dropped.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct BusyGuard {
    _permit: OwnedSemaphorePermit,
}

impl BusyGate {
    /// Creates a gate admitting `capacity` concurrent holders (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// A gate with exactly one slot.
    pub fn single() -> Self {
        Self::new(1)
    }

    /// Takes a slot if one is free. Never waits.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.slots
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| BusyGuard { _permit: permit })
    }

    /// `true` while every slot is taken.
    pub fn is_busy(&self) -> bool {
        self.slots.available_permits() == 0
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
