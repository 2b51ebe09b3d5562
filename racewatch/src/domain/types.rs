//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a lock address
//! where a thread id is expected, and make the engine's signatures read like
//! the event vocabulary they consume.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Thread ID
///
/// The id the interception layer assigns to a target thread. Opaque to the
/// engine beyond equality and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

impl From<u64> for ThreadId {
    fn from(tid: u64) -> Self {
        ThreadId(tid)
    }
}

/// Virtual address in the target process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u64);

impl Address {
    /// Address `len` bytes past this one, saturating at the top of the
    /// address space.
    #[must_use]
    pub fn offset(self, len: u64) -> Address {
        Address(self.0.saturating_add(len))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for Address {
    fn from(addr: u64) -> Self {
        Address(addr)
    }
}

/// Address of a synchronization object (mutex, rwlock)
///
/// Kept distinct from [`Address`] so lock lookups can't accidentally be keyed
/// by a data address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockAddress(pub u64);

impl fmt::Display for LockAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock@0x{:x}", self.0)
    }
}

impl From<u64> for LockAddress {
    fn from(addr: u64) -> Self {
        LockAddress(addr)
    }
}

/// Logical timestamp
///
/// Value of the process-wide access counter at the moment an access was
/// appended. Orders accesses across all threads; carries no wall-clock
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
