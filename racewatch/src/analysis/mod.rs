//! Analysis logic for detection results
//!
//! This module contains pure aggregation logic over race findings,
//! separated from the engine's hot path and from report presentation.

pub mod hotspot_analyzer;

pub use hotspot_analyzer::{analyze_hotspots, RaceHotspot, RaceHotspotStats};
