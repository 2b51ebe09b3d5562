//! Lock registry
//!
//! Tracks every synchronization object the target locked or unlocked, in one
//! process-wide table keyed by lock address.
//!
//! # Lock Mode Heuristic
//!
//! The interception layer only sees `lock`/`unlock` calls, not whether a
//! reader/writer lock was taken shared or exclusive. The mode is therefore
//! *inferred from call counts*:
//!
//! - a lock call sets [`LockMode::WriteHeld`] once `unlock_count <= lock_count`
//! - an unlock call sets [`LockMode::ReadHeld`] once `unlock_count >= lock_count`
//!
//! This approximates "someone holds this exclusively right now". It is not a
//! reader/writer protocol and it drifts on unbalanced or recursive use; the
//! race detector treats it as a heuristic signal, never as proof.

use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::{LockAddress, ThreadId};

/// Inferred holding mode of a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockMode {
    ReadHeld,
    WriteHeld,
}

/// State of one synchronization object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockRecord {
    pub address: LockAddress,
    pub mode: LockMode,
    pub lock_count: u64,
    pub unlock_count: u64,
    /// Last thread that locked (or first touched) the object
    pub holder: ThreadId,
}

impl LockRecord {
    fn first_lock(address: LockAddress, thread: ThreadId) -> Self {
        Self { address, mode: LockMode::WriteHeld, lock_count: 1, unlock_count: 0, holder: thread }
    }

    fn first_unlock(address: LockAddress, thread: ThreadId) -> Self {
        Self { address, mode: LockMode::ReadHeld, lock_count: 0, unlock_count: 1, holder: thread }
    }

    fn acquired(&mut self, thread: ThreadId) {
        self.lock_count += 1;
        self.holder = thread;
        if self.unlock_count <= self.lock_count {
            self.mode = LockMode::WriteHeld;
        }
    }

    fn released(&mut self) {
        self.unlock_count += 1;
        if self.unlock_count >= self.lock_count {
            self.mode = LockMode::ReadHeld;
        }
    }

    /// Lock state as seen by an access made right now
    #[must_use]
    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot { mode: self.mode, address: self.address, holder: self.holder }
    }
}

/// Lock state captured onto a memory access at append time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSnapshot {
    pub mode: LockMode,
    pub address: LockAddress,
    pub holder: ThreadId,
}

impl LockSnapshot {
    #[must_use]
    pub fn is_write_held(&self) -> bool {
        self.mode == LockMode::WriteHeld
    }
}

#[derive(Debug)]
pub struct LockRegistry {
    records: Mutex<HashMap<LockAddress, LockRecord>>,
    capacity: usize,
    capacity_warned: AtomicBool,
}

impl LockRegistry {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            capacity,
            capacity_warned: AtomicBool::new(false),
        }
    }

    /// Record a lock call. Returns `false` if the address could not be
    /// tracked because the registry is full.
    pub fn on_lock(&self, address: LockAddress, thread: ThreadId) -> bool {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(&address) {
            record.acquired(thread);
            return true;
        }
        if records.len() >= self.capacity {
            drop(records);
            self.warn_full();
            return false;
        }
        records.insert(address, LockRecord::first_lock(address, thread));
        true
    }

    /// Record an unlock call. Unlocks without a matching lock are accepted.
    pub fn on_unlock(&self, address: LockAddress, thread: ThreadId) -> bool {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(&address) {
            record.released();
            return true;
        }
        if records.len() >= self.capacity {
            drop(records);
            self.warn_full();
            return false;
        }
        records.insert(address, LockRecord::first_unlock(address, thread));
        true
    }

    #[must_use]
    pub fn snapshot(&self, address: LockAddress) -> Option<LockSnapshot> {
        self.records.lock().get(&address).map(LockRecord::snapshot)
    }

    #[must_use]
    pub fn get(&self, address: LockAddress) -> Option<LockRecord> {
        self.records.lock().get(&address).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn warn_full(&self) {
        if !self.capacity_warned.swap(true, Ordering::Relaxed) {
            warn!(
                "Lock registry full ({} locks): accesses under new locks count as unprotected",
                self.capacity
            );
        }
    }
}
