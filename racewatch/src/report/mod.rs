//! Teardown report
//!
//! Everything the engine hands back when the target process ends: the two
//! global race counters, a summary line per thread, the race hotspots and a
//! bounded sample of concrete findings.

pub mod display;

use serde::Serialize;

use crate::analysis::RaceHotspot;
use crate::domain::{LockAddress, ThreadId};
use crate::engine::detector::RaceFinding;

pub use display::{counters_line, display_counters, display_report};

/// Final per-thread state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    pub thread_id: ThreadId,
    /// Reads recorded against memory this thread allocated
    pub reads: usize,
    /// Writes recorded against memory this thread allocated
    pub writes: usize,
    pub ended: bool,
    /// Lock still marked as held at teardown
    pub held_lock: Option<LockAddress>,
}

/// Event bookkeeping counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Accesses appended to a log (equals the final logical timestamp)
    pub tracked_accesses: u64,
    /// Accesses outside every recorded allocation
    pub untracked_accesses: u64,
    /// Accesses with an operation code that is neither read nor write
    pub unclassified_accesses: u64,
    /// Events from or about threads the engine does not know
    pub discarded_events: u64,
    pub dropped_allocations: u64,
    pub allocations: usize,
    pub locks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RaceReport {
    pub detected_races: u64,
    pub checked_but_ok_races: u64,
    pub threads: Vec<ThreadSummary>,
    pub hotspots: Vec<RaceHotspot>,
    pub findings: Vec<RaceFinding>,
    pub stats: EngineStats,
}

impl RaceReport {
    #[must_use]
    pub fn has_races(&self) -> bool {
        self.detected_races > 0
    }
}
