//! # Race Detection Engine
//!
//! [`RaceEngine`] owns every piece of analysis state and is the surface the
//! interception layer calls into. Callbacks arrive concurrently from the
//! target's threads, so the engine is shared by reference (`Arc<RaceEngine>`)
//! and each table carries its own lock.
//!
//! ## Components
//!
//! - [`allocation`]: heap ranges and their owning threads
//! - [`locks`]: lock/unlock counts and the inferred lock mode
//! - [`threads`]: per-thread read/write logs and held-lock markers
//! - [`clock`]: the process-wide logical timestamp
//! - [`detector`]: pairwise race classification and the findings ledger
//! - [`dispatcher`]: batch routing of raw memory references
//!
//! ## Lock Order
//!
//! The thread table is the outer lock. While it is held the dispatcher may
//! take the allocation registry, the lock registry and the findings ledger;
//! none of those ever takes the thread table.
//!
//! ## Failure Policy
//!
//! Unknown threads and untracked addresses are discarded and counted.
//! Running out of thread slots rejects the thread. Failing to grow a log or
//! exhausting the timestamp range is fatal and returned as an
//! [`EngineError`] for the caller to stop the run on.

pub mod allocation;
pub mod clock;
pub mod detector;
pub mod dispatcher;
pub mod locks;
pub mod threads;

use log::{error, info, warn};
use parking_lot::Mutex;
use racewatch_common::MemRef;
use std::sync::atomic::{AtomicU64, Ordering};

pub use allocation::{Allocation, AllocationRegistry, RecordOutcome};
pub use clock::LogicalClock;
pub use detector::{ConflictKind, RaceDetector, RaceFinding};
pub use dispatcher::{BatchOutcome, EventProcessor};
pub use locks::{LockMode, LockRecord, LockRegistry, LockSnapshot};
pub use threads::{MemoryAccess, ThreadState, ThreadTable};

use crate::config::EngineConfig;
use crate::domain::{Address, EngineError, LockAddress, ThreadId, Timestamp};
use crate::report::{EngineStats, RaceReport, ThreadSummary};

/// Answer to a thread-start event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadAdmission {
    Accepted,
    /// Thread table full; the thread's events will be discarded.
    Rejected,
}

impl ThreadAdmission {
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, ThreadAdmission::Accepted)
    }
}

/// Event bookkeeping shared by every callback
#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    tracked: AtomicU64,
    untracked: AtomicU64,
    unclassified: AtomicU64,
    discarded: AtomicU64,
}

impl EngineCounters {
    pub(crate) fn absorb(&self, outcome: &BatchOutcome) {
        self.tracked.fetch_add(outcome.tracked, Ordering::Relaxed);
        self.untracked.fetch_add(outcome.untracked, Ordering::Relaxed);
        self.unclassified.fetch_add(outcome.unclassified, Ordering::Relaxed);
        self.discarded.fetch_add(outcome.discarded, Ordering::Relaxed);
    }

    fn discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub struct RaceEngine {
    config: EngineConfig,
    allocations: AllocationRegistry,
    locks: LockRegistry,
    threads: Mutex<ThreadTable>,
    clock: LogicalClock,
    detector: RaceDetector,
    counters: EngineCounters,
}

impl Default for RaceEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl RaceEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            allocations: AllocationRegistry::new(config.max_allocations),
            locks: LockRegistry::new(config.max_locks),
            threads: Mutex::new(ThreadTable::new(config.max_threads, config.log_growth_increment)),
            clock: LogicalClock::new(),
            detector: RaceDetector::new(config.max_recorded_findings),
            counters: EngineCounters::default(),
            config,
        }
    }

    /// Engine whose clock has already handed out `timestamp`
    #[cfg(test)]
    pub(crate) fn with_clock_at(config: EngineConfig, timestamp: u64) -> Self {
        Self { clock: LogicalClock::starting_at(timestamp), ..Self::new(config) }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // Event ingestion

    /// A new target thread appeared.
    ///
    /// A rejection means the thread table is full; the caller must treat it
    /// as fatal for instrumentation correctness.
    pub fn on_thread_start(&self, thread: ThreadId) -> ThreadAdmission {
        match self.threads.lock().register(thread) {
            Ok(_) => ThreadAdmission::Accepted,
            Err(e) => {
                warn!("{e}");
                ThreadAdmission::Rejected
            }
        }
    }

    /// A target thread exited. Its logs stay until teardown.
    pub fn on_thread_end(&self, thread: ThreadId) {
        if !self.threads.lock().end_thread(thread) {
            self.counters.discard();
        }
    }

    /// The target allocated `size` bytes at `address` on `thread`.
    pub fn on_allocation(&self, address: Address, size: u64, thread: ThreadId) {
        if !self.threads.lock().contains(thread) {
            self.counters.discard();
            return;
        }
        self.allocations.record(Allocation { address, size, owner: thread });
    }

    pub fn on_lock_acquire(&self, lock: LockAddress, thread: ThreadId) {
        if !self.threads.lock().set_held_lock(thread, Some(lock)) {
            self.counters.discard();
            return;
        }
        self.locks.on_lock(lock, thread);
    }

    pub fn on_lock_release(&self, lock: LockAddress, thread: ThreadId) {
        if !self.threads.lock().set_held_lock(thread, None) {
            self.counters.discard();
            return;
        }
        self.locks.on_unlock(lock, thread);
    }

    /// Drain a batch of memory references captured on `thread`.
    ///
    /// # Errors
    /// Returns a fatal [`EngineError`] if a log could not grow or the logical
    /// clock ran out; the run must stop.
    pub fn on_memory_access_batch(
        &self,
        thread: ThreadId,
        refs: &[MemRef],
    ) -> Result<BatchOutcome, EngineError> {
        let processor = EventProcessor::new(
            &self.allocations,
            &self.locks,
            &self.clock,
            &self.detector,
            &self.counters,
        );
        let mut threads = self.threads.lock();
        processor.process_batch(&mut threads, thread, refs).inspect_err(|e| {
            error!("Fatal engine error on {thread}: {e}");
        })
    }

    // Queries

    #[must_use]
    pub fn detected_races(&self) -> u64 {
        self.detector.detected_races()
    }

    #[must_use]
    pub fn checked_but_ok_races(&self) -> u64 {
        self.detector.checked_but_ok_races()
    }

    /// Last logical timestamp handed out
    #[must_use]
    pub fn current_timestamp(&self) -> Timestamp {
        self.clock.current()
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.lock().len()
    }

    #[must_use]
    pub fn lock_record(&self, lock: LockAddress) -> Option<LockRecord> {
        self.locks.get(lock)
    }

    #[must_use]
    pub fn find_allocation(&self, address: Address) -> Option<Allocation> {
        self.allocations.find_owner(address)
    }

    /// Run `f` against a thread's state while the table is locked.
    pub fn with_thread<R>(&self, thread: ThreadId, f: impl FnOnce(&ThreadState) -> R) -> Option<R> {
        self.threads.lock().get(thread).map(f)
    }

    #[must_use]
    pub fn thread_summaries(&self) -> Vec<ThreadSummary> {
        self.threads.lock().summaries()
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            tracked_accesses: self.counters.tracked.load(Ordering::Relaxed),
            untracked_accesses: self.counters.untracked.load(Ordering::Relaxed),
            unclassified_accesses: self.counters.unclassified.load(Ordering::Relaxed),
            discarded_events: self.counters.discarded.load(Ordering::Relaxed),
            dropped_allocations: self.allocations.dropped(),
            allocations: self.allocations.len(),
            locks: self.locks.len(),
        }
    }

    /// End of the run: release every per-thread log and build the report.
    ///
    /// Counters are kept, so a second teardown reports the same totals with
    /// no thread summaries.
    pub fn teardown(&self) -> RaceReport {
        let threads = self.threads.lock().drain();
        let report = RaceReport {
            detected_races: self.detected_races(),
            checked_but_ok_races: self.checked_but_ok_races(),
            threads,
            hotspots: self.detector.hotspots(),
            findings: self.detector.findings(),
            stats: self.stats(),
        };
        info!(
            "Teardown: {} threads, {} tracked accesses, detected_races={} checked_but_ok_races={}",
            report.threads.len(),
            report.stats.tracked_accesses,
            report.detected_races,
            report.checked_but_ok_races
        );
        report
    }
}
