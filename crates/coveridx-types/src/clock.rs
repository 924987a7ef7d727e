//! Clock capability injected into the orchestrator.
//!
//! The derivation algorithm never reads the wall clock itself; the host
//! passes a [`Clock`] that resolves [`crate::LATEST_TIMESTAMP`] cells.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cell::Timestamp;

/// Source of "now" in milliseconds.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Timestamp;
}

/// Wall clock, milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                Timestamp::try_from(elapsed.as_millis()).unwrap_or(Timestamp::MAX - 1)
            })
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Test clock moved explicitly by the caller.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `delta` and return the new instant. Wraps like the
    /// underlying atomic.
    pub fn advance(&self, delta: Timestamp) -> Timestamp {
        self.now.fetch_add(delta, Ordering::SeqCst).wrapping_add(delta)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
