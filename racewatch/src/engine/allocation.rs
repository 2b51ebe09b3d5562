//! Allocation registry
//!
//! Remembers every heap range the target allocated together with the thread
//! that allocated it. An access is only interesting to the detector if it
//! lands inside one of these ranges; the owning thread decides which access
//! log it is appended to.
//!
//! Records are never freed during a run. A later allocation that starts at
//! the same address (the allocator reused the block) replaces the earlier
//! record.

use log::warn;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::domain::{Address, ThreadId};

/// A heap block returned to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub address: Address,
    pub size: u64,
    pub owner: ThreadId,
}

impl Allocation {
    /// One past the last byte of the block.
    #[must_use]
    pub fn end(&self) -> Address {
        self.address.offset(self.size)
    }

    /// Check if an address falls within `[address, address + size)`
    #[must_use]
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.address && addr < self.end()
    }
}

/// Result of offering an allocation to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// Registry is full; the allocation was dropped.
    AtCapacity,
    /// Zero-sized blocks can never contain an access.
    Empty,
}

/// Process-wide registry of tracked heap blocks, keyed by start address.
#[derive(Debug)]
pub struct AllocationRegistry {
    blocks: RwLock<BTreeMap<Address, Allocation>>,
    capacity: usize,
    dropped: AtomicU64,
    capacity_warned: AtomicBool,
}

impl AllocationRegistry {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: RwLock::new(BTreeMap::new()),
            capacity,
            dropped: AtomicU64::new(0),
            capacity_warned: AtomicBool::new(false),
        }
    }

    /// Record a new allocation.
    ///
    /// Best effort: a full registry drops the record rather than failing the
    /// target's `malloc`. Dropped records are counted for the report.
    pub fn record(&self, allocation: Allocation) -> RecordOutcome {
        if allocation.size == 0 {
            return RecordOutcome::Empty;
        }

        let mut blocks = self.blocks.write();
        if blocks.len() >= self.capacity && !blocks.contains_key(&allocation.address) {
            drop(blocks);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            if !self.capacity_warned.swap(true, Ordering::Relaxed) {
                warn!(
                    "Allocation registry full ({} blocks): further allocations are not tracked",
                    self.capacity
                );
            }
            return RecordOutcome::AtCapacity;
        }

        blocks.insert(allocation.address, allocation);
        RecordOutcome::Recorded
    }

    /// Find the allocation covering `addr`, if any.
    ///
    /// Assumes live allocations don't overlap: only the block with the
    /// closest start address at or below `addr` is considered.
    #[must_use]
    pub fn find_owner(&self, addr: Address) -> Option<Allocation> {
        let blocks = self.blocks.read();
        blocks
            .range(..=addr)
            .next_back()
            .map(|(_, allocation)| *allocation)
            .filter(|allocation| allocation.contains(addr))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    /// Number of allocations dropped because the registry was full
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
