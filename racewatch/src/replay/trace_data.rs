//! Recorded event traces
//!
//! A trace is JSON Lines: one event object per line, tagged by `"event"`.
//!
//! ```text
//! {"event": "thread_start", "thread": 1}
//! {"event": "alloc", "thread": 1, "address": 4096, "size": 64}
//! {"event": "lock", "thread": 2, "address": 32768}
//! {"event": "access", "thread": 2, "accesses": [{"address": 4136, "size": 4, "opcode": 1}]}
//! {"event": "unlock", "thread": 2, "address": 32768}
//! {"event": "thread_end", "thread": 2}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use racewatch_common::MemRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::domain::{Address, LockAddress, ReplayError, ThreadId};

/// One raw memory reference inside an `access` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceAccess {
    pub address: u64,
    pub size: u32,
    pub opcode: u16,
}

impl From<TraceAccess> for MemRef {
    fn from(access: TraceAccess) -> Self {
        MemRef::new(access.address, access.size, access.opcode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    ThreadStart { thread: ThreadId },
    ThreadEnd { thread: ThreadId },
    Alloc { thread: ThreadId, address: Address, size: u64 },
    Lock { thread: ThreadId, address: LockAddress },
    Unlock { thread: ThreadId, address: LockAddress },
    Access { thread: ThreadId, accesses: Vec<TraceAccess> },
}

impl TraceEvent {
    /// Thread the event was observed on
    #[must_use]
    pub fn thread(&self) -> ThreadId {
        match self {
            TraceEvent::ThreadStart { thread }
            | TraceEvent::ThreadEnd { thread }
            | TraceEvent::Alloc { thread, .. }
            | TraceEvent::Lock { thread, .. }
            | TraceEvent::Unlock { thread, .. }
            | TraceEvent::Access { thread, .. } => *thread,
        }
    }
}

/// Parsed trace (immutable, loaded from file)
#[derive(Debug, Default)]
pub struct TraceData {
    pub events: Vec<TraceEvent>,
    /// Distinct threads appearing in the trace, ascending
    pub threads: Vec<ThreadId>,
}

impl TraceData {
    /// Load a JSON Lines trace from disk.
    ///
    /// # Errors
    /// Returns [`ReplayError::Io`] if the file can't be read and
    /// [`ReplayError::Parse`] naming the first malformed line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a JSON Lines trace from any buffered reader.
    ///
    /// # Errors
    /// Same as [`TraceData::from_file`].
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ReplayError> {
        let mut events = Vec::new();
        let mut threads = BTreeSet::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let event: TraceEvent = serde_json::from_str(trimmed)
                .map_err(|source| ReplayError::Parse { line: index + 1, source })?;
            threads.insert(event.thread());
            events.push(event);
        }

        Ok(TraceData { events, threads: threads.into_iter().collect() })
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}
