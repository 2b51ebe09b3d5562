//! # racewatch - Main Entry Point
//!
//! Replays a recorded event trace through the race detection engine, prints
//! the teardown summary and optionally exports the full report as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use racewatch::cli::Args;
use racewatch::config::EngineConfig;
use racewatch::engine::RaceEngine;
use racewatch::export::ReportExporter;
use racewatch::replay::{Replayer, TraceData};
use racewatch::report::{display_counters, display_report};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_RACES: i32 = 3;

fn main() {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    std::process::exit(match run(&args) {
        Ok(races) if races && args.fail_on_race => EXIT_RACES,
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

/// Replay the trace and report. Returns whether any race was detected.
fn run(args: &Args) -> Result<bool> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let config = args.apply_overrides(config);
    config.validate()?;

    let trace = TraceData::from_file(&args.trace)
        .with_context(|| format!("Failed to load trace {}", args.trace.display()))?;
    info!(
        "Loaded {} events across {} threads from {}",
        trace.event_count(),
        trace.threads.len(),
        args.trace.display()
    );

    let engine = RaceEngine::new(config);
    let replayer = Replayer::new(&engine);
    if args.parallel {
        replayer.parallel(&trace)?;
    } else {
        replayer.sequential(&trace)?;
    }

    let report = engine.teardown();
    if args.quiet {
        display_counters(&report);
    } else {
        display_report(&report, args.top);
    }

    if let Some(ref path) = args.export {
        ReportExporter::new(&report)
            .export_to_file(path)
            .with_context(|| format!("Failed to export report to {}", path.display()))?;
        if !args.quiet {
            println!("Report exported to {}", path.display());
        }
    }

    Ok(report.has_races())
}
