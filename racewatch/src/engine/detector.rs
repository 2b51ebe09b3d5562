//! # Race Detection
//!
//! Classifies a freshly appended access against every access already
//! recorded by any thread.
//!
//! ## Pair Rules
//!
//! For the new access `n` and an earlier access `e` (`e.timestamp < n.timestamp`):
//!
//! 1. Same accessing thread → skipped (a thread cannot race with itself)
//! 2. Both reads → skipped
//! 3. Byte ranges don't overlap → skipped
//! 4. Both made under a lock inferred as write-held → **checked but ok**
//! 5. Anything else → **race** (an access without a lock snapshot is unprotected)
//!
//! Rule 4 is the lockset approximation: it trusts the counting-based lock
//! mode and does not check that both sides held the *same* lock, so it can
//! miss races under unrelated locks and flag races when the lock mode
//! heuristic drifts. There is no happens-before reasoning here.
//!
//! ## Complexity
//!
//! Each check scans every write log (and every read log for a new write),
//! so the cost per access is linear in the number of recorded accesses.

use log::debug;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::analysis::{RaceHotspot, RaceHotspotStats};
use crate::domain::{Address, ThreadId, Timestamp};
use crate::engine::threads::{MemoryAccess, ThreadTable};

/// Shape of a conflicting pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    WriteWrite,
    /// One side read, the other wrote
    ReadWrite,
}

/// Outcome of comparing one candidate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairVerdict {
    Race,
    /// Both sides held a write-held lock
    Protected,
}

/// Compare a new access against one earlier access.
///
/// Returns `None` when the pair is not a race candidate at all.
#[must_use]
pub fn classify_pair(new: &MemoryAccess, earlier: &MemoryAccess) -> Option<PairVerdict> {
    if earlier.timestamp >= new.timestamp || earlier.thread == new.thread {
        return None;
    }
    if !new.kind.is_write() && !earlier.kind.is_write() {
        return None;
    }
    if !new.overlaps(earlier) {
        return None;
    }

    if new.is_write_protected() && earlier.is_write_protected() {
        Some(PairVerdict::Protected)
    } else {
        Some(PairVerdict::Race)
    }
}

/// A concrete racing pair, kept for the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceFinding {
    pub address: Address,
    /// Thread whose allocation holds the address
    pub owner: ThreadId,
    pub conflict: ConflictKind,
    pub earlier_thread: ThreadId,
    pub earlier_timestamp: Timestamp,
    pub earlier_locked: bool,
    pub later_thread: ThreadId,
    pub later_timestamp: Timestamp,
    pub later_locked: bool,
}

impl RaceFinding {
    fn new(owner: ThreadId, earlier: &MemoryAccess, later: &MemoryAccess) -> Self {
        let conflict = if earlier.kind.is_write() && later.kind.is_write() {
            ConflictKind::WriteWrite
        } else {
            ConflictKind::ReadWrite
        };
        Self {
            address: later.address,
            owner,
            conflict,
            earlier_thread: earlier.thread,
            earlier_timestamp: earlier.timestamp,
            earlier_locked: earlier.has_lock(),
            later_thread: later.thread,
            later_timestamp: later.timestamp,
            later_locked: later.has_lock(),
        }
    }
}

/// Counts produced by one [`RaceDetector::check`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub races: u64,
    pub protected: u64,
}

/// Bounded sample of findings plus per-address aggregation of all races
#[derive(Debug)]
struct RaceLedger {
    findings: Vec<RaceFinding>,
    max_findings: usize,
    hotspots: RaceHotspotStats,
}

impl RaceLedger {
    fn record(&mut self, finding: RaceFinding) {
        self.hotspots.record_finding(&finding);
        if self.findings.len() < self.max_findings {
            self.findings.push(finding);
        }
    }
}

/// Race detector with the global `detected_races` / `checked_but_ok_races`
/// counters.
#[derive(Debug)]
pub struct RaceDetector {
    detected: AtomicU64,
    checked_ok: AtomicU64,
    ledger: Mutex<RaceLedger>,
}

impl RaceDetector {
    #[must_use]
    pub fn new(max_findings: usize) -> Self {
        Self {
            detected: AtomicU64::new(0),
            checked_ok: AtomicU64::new(0),
            ledger: Mutex::new(RaceLedger {
                findings: Vec::new(),
                max_findings,
                hotspots: RaceHotspotStats::new(),
            }),
        }
    }

    /// Check a just-appended access against every thread's logs.
    ///
    /// Must run while the caller still holds the thread table, so no access
    /// with a later timestamp can have been appended in between.
    pub fn check(&self, threads: &ThreadTable, access: &MemoryAccess) -> CheckSummary {
        let mut summary = CheckSummary::default();
        let mut findings = Vec::new();

        for state in threads.states() {
            // A read can only conflict with writes
            let reads: &[MemoryAccess] = if access.kind.is_write() { state.reads() } else { &[] };

            for earlier in state.writes().iter().chain(reads) {
                match classify_pair(access, earlier) {
                    None => {}
                    Some(PairVerdict::Protected) => summary.protected += 1,
                    Some(PairVerdict::Race) => {
                        summary.races += 1;
                        debug!(
                            "race on {} between {} ({}) and {} ({})",
                            access.address,
                            earlier.thread,
                            earlier.timestamp,
                            access.thread,
                            access.timestamp
                        );
                        findings.push(RaceFinding::new(state.id(), earlier, access));
                    }
                }
            }
        }

        if !findings.is_empty() {
            let mut ledger = self.ledger.lock();
            for finding in findings {
                ledger.record(finding);
            }
        }

        self.detected.fetch_add(summary.races, Ordering::Relaxed);
        self.checked_ok.fetch_add(summary.protected, Ordering::Relaxed);
        summary
    }

    #[must_use]
    pub fn detected_races(&self) -> u64 {
        self.detected.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn checked_but_ok_races(&self) -> u64 {
        self.checked_ok.load(Ordering::Relaxed)
    }

    /// Copy of the recorded findings (oldest first)
    #[must_use]
    pub fn findings(&self) -> Vec<RaceFinding> {
        self.ledger.lock().findings.clone()
    }

    /// Addresses ranked by race count
    #[must_use]
    pub fn hotspots(&self) -> Vec<RaceHotspot> {
        self.ledger.lock().hotspots.to_hotspots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LockAddress;
    use crate::engine::locks::{LockMode, LockSnapshot};
    use racewatch_common::AccessKind;

    fn access(
        thread: u64,
        kind: AccessKind,
        timestamp: u64,
        lock: Option<LockMode>,
    ) -> MemoryAccess {
        MemoryAccess {
            address: Address(0x10),
            size: 4,
            opcode: kind.opcode(),
            kind,
            thread: ThreadId(thread),
            timestamp: Timestamp(timestamp),
            lock: lock.map(|mode| LockSnapshot {
                mode,
                address: LockAddress(0xAA),
                holder: ThreadId(thread),
            }),
        }
    }

    #[test]
    fn test_same_thread_never_a_candidate() {
        let earlier = access(1, AccessKind::Write, 1, None);
        let new = access(1, AccessKind::Write, 2, None);
        assert_eq!(classify_pair(&new, &earlier), None);
    }

    #[test]
    fn test_unlocked_writes_race() {
        let earlier = access(1, AccessKind::Write, 1, None);
        let new = access(2, AccessKind::Write, 2, None);
        assert_eq!(classify_pair(&new, &earlier), Some(PairVerdict::Race));
    }

    #[test]
    fn test_write_held_on_both_sides_is_protected() {
        let earlier = access(1, AccessKind::Write, 1, Some(LockMode::WriteHeld));
        let new = access(2, AccessKind::Read, 2, Some(LockMode::WriteHeld));
        assert_eq!(classify_pair(&new, &earlier), Some(PairVerdict::Protected));
    }

    #[test]
    fn test_one_side_unprotected_races() {
        let earlier = access(1, AccessKind::Write, 1, Some(LockMode::WriteHeld));
        let read_held = access(2, AccessKind::Write, 2, Some(LockMode::ReadHeld));
        let unlocked = access(2, AccessKind::Write, 3, None);
        assert_eq!(classify_pair(&read_held, &earlier), Some(PairVerdict::Race));
        assert_eq!(classify_pair(&unlocked, &earlier), Some(PairVerdict::Race));
    }

    #[test]
    fn test_reads_never_conflict() {
        let earlier = access(1, AccessKind::Read, 1, None);
        let new = access(2, AccessKind::Read, 2, None);
        assert_eq!(classify_pair(&new, &earlier), None);
    }

    #[test]
    fn test_only_strictly_earlier_accesses_compared() {
        let new = access(2, AccessKind::Write, 5, None);
        let same_time = access(1, AccessKind::Write, 5, None);
        let later = access(1, AccessKind::Write, 6, None);
        assert_eq!(classify_pair(&new, &same_time), None);
        assert_eq!(classify_pair(&new, &later), None);
    }

    #[test]
    fn test_check_counts_and_records() {
        let mut table = ThreadTable::new(4, 16);
        table.register(ThreadId(0)).unwrap();
        let owner = table.get_mut(ThreadId(0)).unwrap();
        owner.append(access(1, AccessKind::Write, 1, None)).unwrap();
        owner.append(access(1, AccessKind::Read, 2, None)).unwrap();
        let new = access(2, AccessKind::Write, 3, None);
        owner.append(new).unwrap();

        let detector = RaceDetector::new(1);
        let summary = detector.check(&table, &new);

        // write/write and read/write against thread 1, never against itself
        assert_eq!(summary, CheckSummary { races: 2, protected: 0 });
        assert_eq!(detector.detected_races(), 2);
        assert_eq!(detector.checked_but_ok_races(), 0);

        // Findings are capped, hotspots still see every race
        let findings = detector.findings();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].conflict, ConflictKind::WriteWrite);
        assert_eq!(findings[0].owner, ThreadId(0));
        let hotspots = detector.hotspots();
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].races, 2);
    }

    #[test]
    fn test_new_read_skips_read_logs() {
        let mut table = ThreadTable::new(4, 16);
        table.register(ThreadId(0)).unwrap();
        let owner = table.get_mut(ThreadId(0)).unwrap();
        owner.append(access(1, AccessKind::Read, 1, None)).unwrap();
        let new = access(2, AccessKind::Read, 2, None);
        owner.append(new).unwrap();

        let detector = RaceDetector::new(8);
        assert_eq!(detector.check(&table, &new), CheckSummary::default());
    }
}
