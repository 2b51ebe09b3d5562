use racewatch::domain::{Address, ThreadId};
use racewatch::engine::RaceEngine;
use racewatch::export::ReportExporter;
use racewatch_common::MemRef;

fn racy_engine() -> RaceEngine {
    let engine = RaceEngine::default();
    for id in 1..=3 {
        assert!(engine.on_thread_start(ThreadId(id)).is_accepted());
    }
    engine.on_allocation(Address(0x1000), 64, ThreadId(1));
    engine.on_memory_access_batch(ThreadId(2), &[MemRef::write(0x1010, 4)]).unwrap();
    engine.on_memory_access_batch(ThreadId(3), &[MemRef::write(0x1010, 4)]).unwrap();
    engine.on_memory_access_batch(ThreadId(3), &[MemRef::read(0x1020, 4)]).unwrap();
    engine.on_memory_access_batch(ThreadId(2), &[MemRef::write(0x1020, 4)]).unwrap();
    engine
}

#[test]
fn test_export_creates_valid_json() {
    let report = racy_engine().teardown();
    let mut buffer = Vec::new();
    ReportExporter::new(&report).export(&mut buffer).expect("Failed to export report");

    let json_str = String::from_utf8(buffer).expect("Invalid UTF-8");
    let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("Invalid JSON");

    assert_eq!(parsed["detected_races"], 2);
    assert_eq!(parsed["checked_but_ok_races"], 0);
    assert_eq!(parsed["threads"].as_array().map(Vec::len), Some(3));
    assert_eq!(parsed["threads"][0]["thread_id"], 1);
    assert_eq!(parsed["threads"][0]["writes"], 3);
    assert_eq!(parsed["threads"][0]["reads"], 1);
    assert_eq!(parsed["findings"][0]["conflict"], "write_write");
    assert_eq!(parsed["findings"][1]["conflict"], "read_write");
    assert_eq!(parsed["stats"]["tracked_accesses"], 4);
}

#[test]
fn test_export_to_file() {
    let report = racy_engine().teardown();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");

    ReportExporter::new(&report).export_to_file(&path).unwrap();

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let hotspots = parsed["hotspots"].as_array().unwrap();
    assert_eq!(hotspots.len(), 2);
    // Ties on race count are ordered by address
    assert_eq!(hotspots[0]["address"], 0x1010);
    assert_eq!(hotspots[0]["owner"], 1);
    assert_eq!(hotspots[0]["threads"]["2"], 1);
}

#[test]
fn test_findings_sample_is_bounded() {
    let engine = RaceEngine::new(racewatch::config::EngineConfig {
        max_recorded_findings: 2,
        ..Default::default()
    });
    for id in 1..=2 {
        engine.on_thread_start(ThreadId(id));
    }
    engine.on_allocation(Address(0x1000), 64, ThreadId(1));
    for _ in 0..5 {
        engine.on_memory_access_batch(ThreadId(1), &[MemRef::write(0x1000, 4)]).unwrap();
        engine.on_memory_access_batch(ThreadId(2), &[MemRef::write(0x1000, 4)]).unwrap();
    }

    let report = engine.teardown();
    assert!(report.detected_races > 2);
    assert_eq!(report.findings.len(), 2);
    assert_eq!(report.hotspots[0].races, report.detected_races);
}
