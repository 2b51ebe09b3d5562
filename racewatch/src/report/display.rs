//! Console summary of the teardown report

use super::RaceReport;

/// Print the teardown summary
pub fn display_report(report: &RaceReport, top: usize) {
    println!("------ results ------");
    for thread in &report.threads {
        let state = if thread.ended { "ended" } else { "running" };
        print!(
            "{}  reads={} writes={} ({state})",
            thread.thread_id, thread.reads, thread.writes
        );
        if let Some(lock) = thread.held_lock {
            print!("  still holding {lock}");
        }
        println!();
    }

    if !report.hotspots.is_empty() && top > 0 {
        println!("\nrace hotspots:");
        for hotspot in report.hotspots.iter().take(top) {
            println!(
                "  {}  owner={}  races={}  ({:.1}%)  ww={} rw={}",
                hotspot.address,
                hotspot.owner,
                hotspot.races,
                hotspot.percentage,
                hotspot.write_write,
                hotspot.read_write
            );
        }
    }

    let stats = &report.stats;
    println!(
        "stats: tracked={} untracked={} unclassified={} discarded={} dropped_allocations={}",
        stats.tracked_accesses,
        stats.untracked_accesses,
        stats.unclassified_accesses,
        stats.discarded_events,
        stats.dropped_allocations
    );
    display_counters(report);
}

/// Print only the two global race counters
pub fn display_counters(report: &RaceReport) {
    println!("{}", counters_line(report));
}

#[must_use]
pub fn counters_line(report: &RaceReport) -> String {
    format!(
        "detected_races_counter: {}, checked_but_ok_races_counter: {}",
        report.detected_races, report.checked_but_ok_races
    )
}
