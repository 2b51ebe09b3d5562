//! # Event Dispatch
//!
//! Drains one batch of raw memory references delivered by the interception
//! layer and routes each reference into the engine.
//!
//! ## Per-Reference Routing
//!
//! - unclassified opcode → counted, dropped
//! - address outside every allocation → counted, dropped
//! - owner thread unknown → counted, dropped
//! - otherwise → lock snapshot of the accessing thread, next timestamp,
//!   append to the owner's log, race check
//!
//! The whole batch runs under the thread-table lock held by the caller, so
//! accesses from one batch are stamped and appended without interleaving.

use racewatch_common::MemRef;

use super::allocation::AllocationRegistry;
use super::clock::LogicalClock;
use super::detector::RaceDetector;
use super::locks::LockRegistry;
use super::threads::{MemoryAccess, ThreadState, ThreadTable};
use super::EngineCounters;
use crate::domain::{Address, EngineError, ThreadId};

/// What happened to one delivered batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub tracked: u64,
    pub untracked: u64,
    pub unclassified: u64,
    pub discarded: u64,
    /// Races detected while checking this batch's accesses
    pub races: u64,
    /// Candidate pairs found lock-protected
    pub protected: u64,
}

/// Routes raw references into the registries, logs and detector
pub struct EventProcessor<'a> {
    allocations: &'a AllocationRegistry,
    locks: &'a LockRegistry,
    clock: &'a LogicalClock,
    detector: &'a RaceDetector,
    counters: &'a EngineCounters,
}

impl<'a> EventProcessor<'a> {
    #[must_use]
    pub(crate) fn new(
        allocations: &'a AllocationRegistry,
        locks: &'a LockRegistry,
        clock: &'a LogicalClock,
        detector: &'a RaceDetector,
        counters: &'a EngineCounters,
    ) -> Self {
        Self { allocations, locks, clock, detector, counters }
    }

    /// Process every reference of a batch from `thread`.
    ///
    /// A batch from a thread the table doesn't know is discarded whole.
    ///
    /// # Errors
    /// Stops at the first fatal error (timestamp overflow, log growth
    /// failure). References processed before it stay recorded.
    pub fn process_batch(
        &self,
        threads: &mut ThreadTable,
        thread: ThreadId,
        refs: &[MemRef],
    ) -> Result<BatchOutcome, EngineError> {
        let mut outcome = BatchOutcome::default();

        if !threads.contains(thread) {
            outcome.discarded = refs.len() as u64;
            self.counters.absorb(&outcome);
            return Ok(outcome);
        }

        let result = refs
            .iter()
            .try_for_each(|mem_ref| self.process_ref(threads, thread, mem_ref, &mut outcome));
        self.counters.absorb(&outcome);
        result.map(|()| outcome)
    }

    fn process_ref(
        &self,
        threads: &mut ThreadTable,
        thread: ThreadId,
        mem_ref: &MemRef,
        outcome: &mut BatchOutcome,
    ) -> Result<(), EngineError> {
        let Some(kind) = mem_ref.kind() else {
            outcome.unclassified += 1;
            return Ok(());
        };

        let address = Address(mem_ref.addr);
        let Some(allocation) = self.allocations.find_owner(address) else {
            outcome.untracked += 1;
            return Ok(());
        };

        // Lock state of the thread making the access, not of the owner
        let lock = threads
            .get(thread)
            .and_then(ThreadState::held_lock)
            .and_then(|lock| self.locks.snapshot(lock));

        let Some(owner) = threads.get_mut(allocation.owner) else {
            outcome.discarded += 1;
            return Ok(());
        };

        let access = MemoryAccess {
            address,
            size: u64::from(mem_ref.size),
            opcode: mem_ref.opcode,
            kind,
            thread,
            timestamp: self.clock.tick()?,
            lock,
        };
        owner.append(access)?;

        let summary = self.detector.check(threads, &access);
        outcome.tracked += 1;
        outcome.races += summary.races;
        outcome.protected += summary.protected;
        Ok(())
    }
}
