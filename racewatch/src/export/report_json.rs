//! JSON report export
//!
//! Writes the full [`RaceReport`] (counters, per-thread summaries, hotspots,
//! sampled findings and stats) as a single pretty-printed JSON document.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::ExportError;
use crate::report::RaceReport;

pub struct ReportExporter<'a> {
    report: &'a RaceReport,
}

impl<'a> ReportExporter<'a> {
    #[must_use]
    pub fn new(report: &'a RaceReport) -> Self {
        Self { report }
    }

    /// Serialize the report to `writer`.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut writer, self.report)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Create (or truncate) `path` and write the report into it.
    ///
    /// # Errors
    /// Returns an error if the file can't be created or written.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| ExportError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
        self.export(BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::EngineStats;

    fn empty_report() -> RaceReport {
        RaceReport {
            detected_races: 2,
            checked_but_ok_races: 5,
            threads: Vec::new(),
            hotspots: Vec::new(),
            findings: Vec::new(),
            stats: EngineStats::default(),
        }
    }

    #[test]
    fn test_export_writes_counters() {
        let report = empty_report();
        let mut buffer = Vec::new();
        ReportExporter::new(&report).export(&mut buffer).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed["detected_races"], 2);
        assert_eq!(parsed["checked_but_ok_races"], 5);
        assert!(parsed["stats"].is_object());
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let report = empty_report();
        let err = ReportExporter::new(&report)
            .export_to_file("/nonexistent/racewatch/report.json")
            .unwrap_err();
        let ExportError::WriteFailed { path, source } = &err else {
            panic!("expected WriteFailed, got {err:?}");
        };
        assert_eq!(path, Path::new("/nonexistent/racewatch/report.json"));
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        assert!(std::error::Error::source(&err).is_some());
    }
}
