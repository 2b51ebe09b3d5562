//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::config::EngineConfig;

#[derive(Parser, Debug)]
#[command(
    name = "racewatch",
    about = "Replay a recorded memory/lock event trace and report data races",
    after_help = "\
EXAMPLES:
    racewatch trace.jsonl                         Replay in file order
    racewatch trace.jsonl --parallel              One worker per target thread
    racewatch trace.jsonl --export report.json    Also write the JSON report
    RUST_LOG=debug racewatch trace.jsonl          Log every race as it is found"
)]
pub struct Args {
    /// Event trace to replay (JSON Lines)
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Engine configuration file (JSON); flags below override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum number of target threads
    #[arg(long, value_name = "N")]
    pub max_threads: Option<usize>,

    /// Replay each target thread on its own worker
    #[arg(long)]
    pub parallel: bool,

    /// Export the report as JSON
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Exit with status 3 when any race is detected
    #[arg(long)]
    pub fail_on_race: bool,

    /// Number of race hotspots to print
    #[arg(long, default_value = "10", value_name = "N")]
    pub top: usize,

    /// Print only the race counters
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Apply command-line overrides on top of a loaded configuration
    #[must_use]
    pub fn apply_overrides(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(max_threads) = self.max_threads {
            config.max_threads = max_threads;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["racewatch", "trace.jsonl"]).unwrap();
        assert_eq!(args.trace, PathBuf::from("trace.jsonl"));
        assert!(!args.parallel);
        assert_eq!(args.top, 10);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_max_threads_overrides_config() {
        let args = Args::try_parse_from([
            "racewatch",
            "t.jsonl",
            "--max-threads",
            "4",
            "--parallel",
        ])
        .unwrap();
        let config = args.apply_overrides(EngineConfig::default());
        assert_eq!(config.max_threads, 4);
        assert!(args.parallel);
    }

    #[test]
    fn test_trace_is_required() {
        assert!(Args::try_parse_from(["racewatch"]).is_err());
    }
}
