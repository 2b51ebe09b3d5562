//! # Shared Data Structures (Interception Layer ↔ Engine)
//!
//! Defines the raw access record and operation-type vocabulary shared between
//! the interception layer that instruments the target process and the
//! race-detection engine. Records use `#[repr(C)]` so an interception layer
//! written against the same layout can hand its per-thread buffers over
//! without copying.
//!
//! ## Operation Types
//!
//! The interception layer tags every captured memory reference with an
//! operation code from its own instruction vocabulary. The engine only cares
//! whether a code is a read or a write:
//!
//! - [`WRITE_OPCODES`] - codes classified as stores
//! - [`READ_OPCODES`] - codes classified as loads
//!
//! Anything else is unclassified and never reaches race analysis.
//!
//! ## Key Types
//!
//! - [`MemRef`] - one captured memory reference
//! - [`AccessKind`] - read/write classification of an operation code

#![no_std]

// ============================================================================
// Operation Type Constants
// ============================================================================

/// Plain store emitted for generic write instrumentation.
pub const OP_WRITE: u16 = 1;

/// Plain load emitted for generic read instrumentation.
pub const OP_READ: u16 = 0;

/// Operation codes the interception layer reports for stores.
///
/// Covers the generic write marker plus the string/vector store opcodes the
/// layer emits for `rep stos`-style and SIMD writes.
pub const WRITE_OPCODES: [u16; 5] = [OP_WRITE, 456, 457, 458, 568];

/// Operation codes the interception layer reports for loads.
pub const READ_OPCODES: [u16; 8] = [OP_READ, 173, 197, 225, 227, 228, 229, 299];

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Read/write classification of a memory reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    /// Classify an interception-layer operation code.
    ///
    /// Returns `None` for codes that are neither a known load nor a known
    /// store (prefetches, fences and the like).
    #[must_use]
    pub fn from_opcode(opcode: u16) -> Option<Self> {
        if WRITE_OPCODES.contains(&opcode) {
            Some(AccessKind::Write)
        } else if READ_OPCODES.contains(&opcode) {
            Some(AccessKind::Read)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, AccessKind::Write)
    }

    /// Canonical operation code for this kind.
    #[must_use]
    pub fn opcode(self) -> u16 {
        match self {
            AccessKind::Read => OP_READ,
            AccessKind::Write => OP_WRITE,
        }
    }
}

/// A single memory reference captured by the interception layer.
///
/// The layer fills a per-thread buffer of these and delivers it in one batch
/// whenever the buffer fills up (or the thread exits).
///
/// **Memory Layout**: `#[repr(C)]`, 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRef {
    /// Virtual address that was read or written
    pub addr: u64,

    /// Width of the access in bytes
    pub size: u32,

    /// Operation code (see [`WRITE_OPCODES`] / [`READ_OPCODES`])
    pub opcode: u16,

    /// Padding for 8-byte alignment
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 2],
}

impl MemRef {
    #[must_use]
    pub fn new(addr: u64, size: u32, opcode: u16) -> Self {
        Self { addr, size, opcode, _padding: [0; 2] }
    }

    #[must_use]
    pub fn read(addr: u64, size: u32) -> Self {
        Self::new(addr, size, OP_READ)
    }

    #[must_use]
    pub fn write(addr: u64, size: u32) -> Self {
        Self::new(addr, size, OP_WRITE)
    }

    /// Read/write classification of this reference, if its opcode is known.
    #[must_use]
    pub fn kind(&self) -> Option<AccessKind> {
        AccessKind::from_opcode(self.opcode)
    }
}
