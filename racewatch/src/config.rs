//! Engine configuration
//!
//! Capacity limits and growth parameters for the detector. Defaults match the
//! limits the detector has always shipped with; a JSON file can override any
//! subset of them and CLI flags override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default maximum number of concurrently tracked target threads
pub const DEFAULT_MAX_THREADS: usize = 100;

/// Default maximum number of recorded heap allocations
pub const DEFAULT_MAX_ALLOCATIONS: usize = 10_000;

/// Default maximum number of distinct lock addresses
pub const DEFAULT_MAX_LOCKS: usize = 10_000;

/// Default number of entries an access log grows by when it fills up
pub const DEFAULT_LOG_GROWTH_INCREMENT: usize = 65_536;

/// Default number of concrete race findings kept for the report
pub const DEFAULT_MAX_RECORDED_FINDINGS: usize = 1_024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Thread registrations beyond this are rejected.
    pub max_threads: usize,
    /// Allocations beyond this are dropped (and counted).
    pub max_allocations: usize,
    /// Lock addresses beyond this are not tracked.
    pub max_locks: usize,
    /// Fixed growth step for per-thread access logs.
    pub log_growth_increment: usize,
    /// Bound on the race findings sample.
    pub max_recorded_findings: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            max_allocations: DEFAULT_MAX_ALLOCATIONS,
            max_locks: DEFAULT_MAX_LOCKS,
            log_growth_increment: DEFAULT_LOG_GROWTH_INCREMENT,
            max_recorded_findings: DEFAULT_MAX_RECORDED_FINDINGS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file. Missing fields keep defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, names
    /// an unknown field, or sets a zero growth increment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    /// Returns an error if the log growth increment is zero.
    pub fn validate(&self) -> Result<()> {
        if self.log_growth_increment == 0 {
            anyhow::bail!("log_growth_increment must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_threads, 100);
        assert_eq!(config.max_allocations, 10_000);
        assert_eq!(config.max_locks, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_threads": 4 }}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_threads, 4);
        assert_eq!(config.max_allocations, DEFAULT_MAX_ALLOCATIONS);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_thread": 4 }}"#).unwrap();

        assert!(EngineConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_zero_growth_rejected() {
        let config = EngineConfig { log_growth_increment: 0, ..EngineConfig::default() };
        assert!(config.validate().is_err());
    }
}
