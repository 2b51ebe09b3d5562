//! Process-wide logical clock

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{EngineError, Timestamp};

/// Largest timestamp the clock hands out (63-bit range)
pub const MAX_TIMESTAMP: u64 = i64::MAX as u64;

/// Monotonic counter stamped onto every tracked access.
///
/// Ticked while the thread table is locked, so timestamps are strictly
/// increasing in append order across all threads.
#[derive(Debug, Default)]
pub struct LogicalClock {
    counter: AtomicU64,
}

impl LogicalClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock and return the new timestamp.
    ///
    /// # Errors
    /// Returns [`EngineError::TimestampOverflow`] once the 63-bit range is
    /// exhausted; the clock stays at its maximum.
    pub fn tick(&self) -> Result<Timestamp, EngineError> {
        self.counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < MAX_TIMESTAMP).then_some(current + 1)
            })
            .map(|previous| Timestamp(previous + 1))
            .map_err(|_| EngineError::TimestampOverflow)
    }

    /// Last timestamp handed out (0 before the first tick)
    #[must_use]
    pub fn current(&self) -> Timestamp {
        Timestamp(self.counter.load(Ordering::SeqCst))
    }

    #[cfg(test)]
    pub(crate) fn starting_at(value: u64) -> Self {
        Self { counter: AtomicU64::new(value) }
    }
}
