//! Sliding-window rate limiter for external model calls

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Length of the trailing window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Upper bound on slots reserved up front
const PREALLOCATED_SLOTS: usize = 64;

/// Admits at most `quota` calls in any trailing 60 seconds
#[derive(Debug)]
pub struct RateLimiter {
    quota: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(quota: usize) -> Self {
        Self {
            quota,
            window: WINDOW,
            calls: Mutex::new(VecDeque::with_capacity(quota.min(PREALLOCATED_SLOTS))),
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Record a call if the window has room
    pub fn allow(&self) -> bool {
        let now = Instant::now();
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        self.prune(&mut calls, now);

        if calls.len() < self.quota {
            calls.push_back(now);
            true
        } else {
            false
        }
    }

    /// Calls still admissible in the current window
    pub fn remaining(&self) -> usize {
        let now = Instant::now();
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        self.prune(&mut calls, now);
        self.quota.saturating_sub(calls.len())
    }

    fn prune(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = calls.front() {
            if now.duration_since(*front) > self.window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}
