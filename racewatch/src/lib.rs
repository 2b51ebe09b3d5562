//! # racewatch - Dynamic Data-Race Detection Engine
//!
//! racewatch watches the heap accesses, allocations, lock operations and
//! thread lifecycle of a multi-threaded target and reports pairs of accesses
//! that may race: different threads touching the same bytes, at least one of
//! them writing, without a write-held lock on both sides.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Interception Layer / Trace Replay                  │
//! │   thread start/end · alloc · lock/unlock · memory ref batches   │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ engine callbacks (any thread)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    RaceEngine (This Crate)                      │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Allocation  │   │    Event     │──▶│ Thread Table │         │
//! │  │   Registry   │◀──│  Dispatcher  │   │ (access logs)│         │
//! │  └──────────────┘   └──────┬───────┘   └──────┬───────┘         │
//! │  ┌──────────────┐          │                  │                 │
//! │  │     Lock     │◀─────────┤                  ▼                 │
//! │  │   Registry   │          │           ┌──────────────┐         │
//! │  └──────────────┘          └──────────▶│   Detector   │         │
//! │                                        │   + Ledger   │         │
//! │                                        └──────┬───────┘         │
//! │                                               ▼                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Analysis   │──▶│    Report    │──▶│    Export    │         │
//! │  │  (Hotspots)  │   │  (teardown)  │   │ (report.json)│         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`engine`]: the [`RaceEngine`](engine::RaceEngine) facade and its tables
//!   - `allocation`: heap ranges and owning threads
//!   - `locks`: lock/unlock counting and the inferred lock mode
//!   - `threads`: per-thread read/write logs and held-lock markers
//!   - `detector`: pairwise race classification
//!   - `dispatcher`: routing raw memory reference batches
//! - [`analysis`]: per-address race aggregation (hotspots)
//! - [`report`]: the teardown report and its console rendering
//! - [`export`]: JSON export of the report
//! - [`replay`]: JSON Lines traces and sequential/parallel replay
//! - [`config`]: capacity limits, loadable from JSON
//! - [`cli`]: command-line arguments of the replay binary
//! - [`domain`]: newtypes (`ThreadId`, `Address`, `LockAddress`, `Timestamp`)
//!   and error enums
//!
//! ## Detection Heuristic
//!
//! Every tracked access is appended to the log of the thread that
//! *allocated* the touched memory, stamped with a process-wide logical
//! timestamp and the lock state of the accessing thread. A new access is
//! compared against every earlier access in every thread's logs, since a
//! reused address range may have been logged under a previous owner:
//!
//! - same thread → never a race
//! - no byte overlap, or both reads → not a candidate
//! - both sides write-held → counted as checked-but-ok
//! - otherwise → counted as a detected race
//!
//! The lock mode is inferred from lock/unlock counts, so a lock taken in
//! read mode can be mistaken for write mode and the other way round. The
//! result is a heuristic, neither sound nor complete.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Replay a recorded trace in file order
//! racewatch trace.jsonl
//!
//! # Replay with one worker per target thread and export the report
//! racewatch trace.jsonl --parallel --export report.json
//!
//! # Fail a CI job when a race shows up
//! racewatch trace.jsonl --fail-on-race -q
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod export;
pub mod replay;
pub mod report;
