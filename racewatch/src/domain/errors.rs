//! Structured error types for racewatch
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::ThreadId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Thread table full: cannot register {thread} (capacity {capacity})")]
    ThreadCapacityExceeded { thread: ThreadId, capacity: usize },

    #[error("Failed to grow {log} log of {thread} past {len} entries")]
    LogGrowthFailed { thread: ThreadId, log: &'static str, len: usize },

    #[error("Logical timestamp overflowed the 63-bit range")]
    TimestampOverflow,
}

impl EngineError {
    /// Whether the analysis can no longer continue correctly.
    ///
    /// Every variant is a capacity exhaustion after which events would be
    /// lost silently, so all of them are fatal. `ThreadCapacityExceeded`
    /// reaches callers as [`ThreadAdmission::Rejected`] from
    /// `on_thread_start`; the other two are returned from
    /// `on_memory_access_batch`.
    ///
    /// [`ThreadAdmission::Rejected`]: crate::engine::ThreadAdmission::Rejected
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::ThreadCapacityExceeded { .. }
                | EngineError::LogGrowthFailed { .. }
                | EngineError::TimestampOverflow
        )
    }
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Malformed trace event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Thread {0} was rejected by the engine (thread table full)")]
    ThreadRejected(ThreadId),

    #[error("Replay worker for {0} panicked")]
    WorkerPanicked(ThreadId),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write report to {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
