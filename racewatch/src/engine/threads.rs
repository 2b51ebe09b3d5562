//! Thread state table
//!
//! One [`ThreadState`] per registered target thread, each holding the read
//! and write logs of accesses to memory *that thread allocated*. Logs are
//! append-only for the whole run: entries are never compacted or reordered,
//! so an index into a log stays valid until teardown.
//!
//! ## Growth
//!
//! Logs grow by a fixed increment when full. Growth goes through
//! `try_reserve_exact` so an allocation failure surfaces as
//! [`EngineError::LogGrowthFailed`] instead of aborting inside the
//! allocator; the caller then stops the run.

use racewatch_common::AccessKind;
use std::collections::HashMap;
use std::collections::TryReserveError;

use crate::domain::{Address, EngineError, LockAddress, ThreadId, Timestamp};
use crate::engine::locks::LockSnapshot;
use crate::report::ThreadSummary;

/// A tracked memory access, immutable once appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAccess {
    pub address: Address,
    pub size: u64,
    pub opcode: u16,
    pub kind: AccessKind,
    /// Thread that performed the access (not the owner of the memory)
    pub thread: ThreadId,
    pub timestamp: Timestamp,
    /// Lock the accessing thread held at the time, if any
    pub lock: Option<LockSnapshot>,
}

impl MemoryAccess {
    #[must_use]
    pub fn has_lock(&self) -> bool {
        self.lock.is_some()
    }

    /// Whether the access was made under a lock inferred as write-held
    #[must_use]
    pub fn is_write_protected(&self) -> bool {
        self.lock.is_some_and(|lock| lock.is_write_held())
    }

    /// Byte ranges intersect. A zero-width access counts as one byte.
    #[must_use]
    pub fn overlaps(&self, other: &MemoryAccess) -> bool {
        self.address < other.span_end() && other.address < self.span_end()
    }

    fn span_end(&self) -> Address {
        self.address.offset(self.size.max(1))
    }
}

/// Append-only access log with fixed-increment growth
#[derive(Debug)]
pub struct AccessLog {
    entries: Vec<MemoryAccess>,
    growth_increment: usize,
}

impl AccessLog {
    #[must_use]
    pub fn new(growth_increment: usize) -> Self {
        Self { entries: Vec::new(), growth_increment: growth_increment.max(1) }
    }

    /// Append an access, growing the backing storage when full.
    ///
    /// # Errors
    /// Returns the allocator error if the log could not grow; the access is
    /// not appended in that case.
    pub fn push(&mut self, access: MemoryAccess) -> Result<(), TryReserveError> {
        if self.entries.len() == self.entries.capacity() {
            self.entries.try_reserve_exact(self.growth_increment)?;
        }
        self.entries.push(access);
        Ok(())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[MemoryAccess] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

/// Per-thread analysis state
#[derive(Debug)]
pub struct ThreadState {
    id: ThreadId,
    reads: AccessLog,
    writes: AccessLog,
    held_lock: Option<LockAddress>,
    ended: bool,
}

impl ThreadState {
    fn new(id: ThreadId, growth_increment: usize) -> Self {
        Self {
            id,
            reads: AccessLog::new(growth_increment),
            writes: AccessLog::new(growth_increment),
            held_lock: None,
            ended: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    #[must_use]
    pub fn reads(&self) -> &[MemoryAccess] {
        self.reads.as_slice()
    }

    #[must_use]
    pub fn writes(&self) -> &[MemoryAccess] {
        self.writes.as_slice()
    }

    /// Lock this thread most recently acquired and has not released
    #[must_use]
    pub fn held_lock(&self) -> Option<LockAddress> {
        self.held_lock
    }

    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Append to the read or write log according to the access kind.
    ///
    /// # Errors
    /// Returns [`EngineError::LogGrowthFailed`] if the log could not grow.
    pub fn append(&mut self, access: MemoryAccess) -> Result<(), EngineError> {
        let (log, name) = match access.kind {
            AccessKind::Read => (&mut self.reads, "read"),
            AccessKind::Write => (&mut self.writes, "write"),
        };
        log.push(access).map_err(|_| EngineError::LogGrowthFailed {
            thread: self.id,
            log: name,
            len: log.len(),
        })
    }

    fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            thread_id: self.id,
            reads: self.reads.len(),
            writes: self.writes.len(),
            ended: self.ended,
            held_lock: self.held_lock,
        }
    }
}

/// All registered threads, keyed by id
#[derive(Debug)]
pub struct ThreadTable {
    threads: HashMap<ThreadId, ThreadState>,
    capacity: usize,
    growth_increment: usize,
}

impl ThreadTable {
    #[must_use]
    pub fn new(capacity: usize, growth_increment: usize) -> Self {
        Self { threads: HashMap::new(), capacity, growth_increment }
    }

    /// Register a thread with empty logs.
    ///
    /// Re-registering a known id (a reused OS thread id) keeps its logs but
    /// clears the ended flag and the held-lock marker. Returns `true` if a
    /// new entry was created.
    ///
    /// # Errors
    /// Returns [`EngineError::ThreadCapacityExceeded`] when the table is full;
    /// existing entries are left untouched.
    pub fn register(&mut self, id: ThreadId) -> Result<bool, EngineError> {
        if let Some(state) = self.threads.get_mut(&id) {
            state.ended = false;
            state.held_lock = None;
            return Ok(false);
        }
        if self.threads.len() >= self.capacity {
            return Err(EngineError::ThreadCapacityExceeded { thread: id, capacity: self.capacity });
        }
        self.threads.insert(id, ThreadState::new(id, self.growth_increment));
        Ok(true)
    }

    #[must_use]
    pub fn contains(&self, id: ThreadId) -> bool {
        self.threads.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: ThreadId) -> Option<&ThreadState> {
        self.threads.get(&id)
    }

    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut ThreadState> {
        self.threads.get_mut(&id)
    }

    /// Set or clear the thread's held-lock marker. Returns `false` for an
    /// unknown thread.
    pub fn set_held_lock(&mut self, id: ThreadId, lock: Option<LockAddress>) -> bool {
        match self.threads.get_mut(&id) {
            Some(state) => {
                state.held_lock = lock;
                true
            }
            None => false,
        }
    }

    /// Mark a thread as finished. Its logs stay for later comparisons.
    pub fn end_thread(&mut self, id: ThreadId) -> bool {
        match self.threads.get_mut(&id) {
            Some(state) => {
                state.ended = true;
                true
            }
            None => false,
        }
    }

    pub fn states(&self) -> impl Iterator<Item = &ThreadState> {
        self.threads.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Summaries of every thread, sorted by id
    #[must_use]
    pub fn summaries(&self) -> Vec<ThreadSummary> {
        let mut summaries: Vec<ThreadSummary> =
            self.threads.values().map(ThreadState::summary).collect();
        summaries.sort_unstable_by_key(|s| s.thread_id);
        summaries
    }

    /// Release every thread's logs, returning their final summaries.
    pub fn drain(&mut self) -> Vec<ThreadSummary> {
        let summaries = self.summaries();
        self.threads.clear();
        self.threads.shrink_to_fit();
        summaries
    }
}
