//! Race hotspot analysis.
//!
//! This module aggregates race findings by address to show where in the
//! target's heap most races happen, and which threads take part in them.
//!
//! # Architecture
//!
//! - **`RaceHotspotStats`** - Streaming aggregation as races are detected
//! - **`analyze_hotspots()`** - Batch analysis over a slice of findings
//!
//! ## Data Flow
//!
//! ```text
//! RaceDetector::check()
//!     │
//!     ├──► RaceHotspotStats.record_finding()  ← every race
//!     │
//!     └──► findings sample (bounded)          ← concrete pairs for the report
//! ```
//!
//! # Performance
//!
//! - `record_finding()`: O(log t) per race (t = threads involved at the address)
//! - `to_hotspots()`: O(n log n) where n = unique racing addresses

// Percentage calculations intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::domain::{Address, ThreadId};
use crate::engine::detector::{ConflictKind, RaceFinding};

// =============================================================================
// RACE HOTSPOT (OUTPUT TYPE)
// =============================================================================

/// An address with aggregated race statistics.
///
/// ```text
/// RACE HOTSPOTS
/// ─────────────────────────────────────────────
///   0x55d0c3a2a2c8  owner=TID:4012  races=118  (92.2%)  ww=60 rw=58
///   0x55d0c3a2a2d0  owner=TID:4012  races=10   ( 7.8%)  ww=10 rw=0
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct RaceHotspot {
    pub address: Address,

    /// Thread whose allocation contains the address.
    pub owner: ThreadId,

    /// Total races detected on this address.
    pub races: u64,

    /// Share of all detected races (0.0 - 100.0).
    pub percentage: f64,

    pub write_write: u64,
    pub read_write: u64,

    /// Per-thread involvement: thread → races it took part in (either side).
    pub threads: BTreeMap<ThreadId, u64>,
}

// =============================================================================
// HOTSPOT STATS (AGGREGATOR)
// =============================================================================

#[derive(Debug, Default)]
pub struct RaceHotspotStats {
    addresses: HashMap<Address, AddressStats>,

    /// Denominator for percentages
    total_races: u64,
}

#[derive(Debug, Clone)]
struct AddressStats {
    owner: ThreadId,
    races: u64,
    write_write: u64,
    read_write: u64,
    threads: BTreeMap<ThreadId, u64>,
}

impl RaceHotspotStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one detected race.
    pub fn record_finding(&mut self, finding: &RaceFinding) {
        self.total_races += 1;

        let stats = self.addresses.entry(finding.address).or_insert_with(|| AddressStats {
            owner: finding.owner,
            races: 0,
            write_write: 0,
            read_write: 0,
            threads: BTreeMap::new(),
        });

        stats.races += 1;
        match finding.conflict {
            ConflictKind::WriteWrite => stats.write_write += 1,
            ConflictKind::ReadWrite => stats.read_write += 1,
        }
        *stats.threads.entry(finding.earlier_thread).or_insert(0) += 1;
        *stats.threads.entry(finding.later_thread).or_insert(0) += 1;
    }

    #[must_use]
    pub fn total_races(&self) -> u64 {
        self.total_races
    }

    /// Hotspots sorted by race count (descending), ties by address.
    #[must_use]
    pub fn to_hotspots(&self) -> Vec<RaceHotspot> {
        let mut hotspots: Vec<RaceHotspot> = self
            .addresses
            .iter()
            .map(|(&address, stats)| {
                let percentage = if self.total_races > 0 {
                    (stats.races as f64 / self.total_races as f64) * 100.0
                } else {
                    0.0
                };
                RaceHotspot {
                    address,
                    owner: stats.owner,
                    races: stats.races,
                    percentage,
                    write_write: stats.write_write,
                    read_write: stats.read_write,
                    threads: stats.threads.clone(),
                }
            })
            .collect();

        hotspots.sort_unstable_by(|a, b| b.races.cmp(&a.races).then(a.address.cmp(&b.address)));
        hotspots
    }
}

/// Analyze a set of findings to identify race hotspots (batch analysis).
///
/// For incremental updates while events stream in, use `RaceHotspotStats`.
#[must_use]
pub fn analyze_hotspots(findings: &[RaceFinding]) -> Vec<RaceHotspot> {
    let mut stats = RaceHotspotStats::new();
    for finding in findings {
        stats.record_finding(finding);
    }
    stats.to_hotspots()
}
