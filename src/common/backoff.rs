use super::constants::{DEFAULT_SPIN_LIMIT, MAX_SPIN_LIMIT};

use std::{hint, thread};

/// A delay policy applied between retries of a trie operation.
///
/// The trie calls [`backoff`](#tymethod.backoff) every time a compare-and-swap
/// on a slot fails or a slot is found in the middle of an expansion. `attempt`
/// starts at 0 for each operation and grows by one per retry, so stateless
/// implementations can still escalate.
///
/// A backoff must never block indefinitely: the operations of the trie are
/// lock-free only as long as the backoff returns.
pub trait Backoff: Send + Sync {
    fn backoff(&self, attempt: u32);
}

/// Retries immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    #[inline]
    fn backoff(&self, _attempt: u32) {}
}

/// Spins for a fixed number of iterations.
#[derive(Clone, Copy, Debug)]
pub struct SpinBackoff {
    spins: u32,
}

impl SpinBackoff {
    pub fn new(spins: u32) -> Self {
        Self { spins }
    }
}

impl Default for SpinBackoff {
    fn default() -> Self {
        Self::new(1 << DEFAULT_SPIN_LIMIT)
    }
}

impl Backoff for SpinBackoff {
    #[inline]
    fn backoff(&self, _attempt: u32) {
        for _ in 0..self.spins {
            hint::spin_loop();
        }
    }
}

/// Yields the time slice of the current thread to the OS scheduler.
#[derive(Clone, Copy, Debug, Default)]
pub struct YieldBackoff;

impl Backoff for YieldBackoff {
    #[inline]
    fn backoff(&self, _attempt: u32) {
        thread::yield_now();
    }
}

/// Spins for `2^attempt` iterations, then falls back to yielding once
/// `spin_limit` is exceeded.
///
/// This is the schedule of `crossbeam_utils::Backoff::snooze`, driven by the
/// attempt number instead of internal state. Retries never stop, so there is
/// no counterpart of its completion limit.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialBackoff {
    spin_limit: u32,
}

impl ExponentialBackoff {
    /// # Panics
    ///
    /// Panics if `spin_limit` is greater than 30.
    pub fn new(spin_limit: u32) -> Self {
        assert!(spin_limit <= MAX_SPIN_LIMIT);
        Self { spin_limit }
    }

    /// Returns `true` once the backoff has escalated to yielding.
    pub fn is_yielding(&self, attempt: u32) -> bool {
        attempt > self.spin_limit
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_SPIN_LIMIT)
    }
}

impl Backoff for ExponentialBackoff {
    fn backoff(&self, attempt: u32) {
        if self.is_yielding(attempt) {
            thread::yield_now();
        } else {
            for _ in 0..(1u32 << attempt) {
                hint::spin_loop();
            }
        }
    }
}
