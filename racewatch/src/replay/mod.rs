//! Offline trace replay
//!
//! Drives a [`RaceEngine`](crate::engine::RaceEngine) from a recorded event
//! trace instead of a live interception layer.

pub mod replayer;
pub mod trace_data;

pub use replayer::{ReplaySummary, Replayer};
pub use trace_data::{TraceAccess, TraceData, TraceEvent};
