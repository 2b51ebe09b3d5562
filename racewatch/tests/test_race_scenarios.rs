use racewatch::config::EngineConfig;
use racewatch::domain::{Address, LockAddress, ThreadId, Timestamp};
use racewatch::engine::{RaceEngine, ThreadAdmission};
use racewatch_common::MemRef;
use std::sync::Mutex;
use std::thread;

const MAIN: ThreadId = ThreadId(1);
const HEAP: u64 = 0x5555_5555_9000;
const HEAP_INTS: u64 = 4096;
const MUTEX_G: LockAddress = LockAddress(0x5555_5555_8040);

/// Engine with `workers` extra threads registered and 4096 ints owned by MAIN
fn engine_with_shared_heap(workers: u64) -> RaceEngine {
    let engine =
        RaceEngine::new(EngineConfig { log_growth_increment: 256, ..EngineConfig::default() });
    assert!(engine.on_thread_start(MAIN).is_accepted());
    for id in 2..2 + workers {
        assert!(engine.on_thread_start(ThreadId(id)).is_accepted());
    }
    engine.on_allocation(Address(HEAP), HEAP_INTS * 4, MAIN);
    engine
}

fn element(index: u64) -> u64 {
    HEAP + index * 4
}

fn store(engine: &RaceEngine, thread: ThreadId, index: u64) {
    engine.on_memory_access_batch(thread, &[MemRef::write(element(index), 4)]).unwrap();
}

fn load(engine: &RaceEngine, thread: ThreadId, index: u64) {
    engine.on_memory_access_batch(thread, &[MemRef::read(element(index), 4)]).unwrap();
}

fn locked_store(engine: &RaceEngine, thread: ThreadId, index: u64) {
    engine.on_lock_acquire(MUTEX_G, thread);
    store(engine, thread, index);
    engine.on_lock_release(MUTEX_G, thread);
}

#[test]
fn test_same_thread_never_races() {
    let engine = engine_with_shared_heap(1);
    for _ in 0..10 {
        store(&engine, ThreadId(2), 10);
        load(&engine, ThreadId(2), 10);
    }
    assert_eq!(engine.detected_races(), 0);
    assert_eq!(engine.checked_but_ok_races(), 0);
}

#[test]
fn test_unprotected_write_write_is_race() {
    let engine = engine_with_shared_heap(2);
    store(&engine, ThreadId(2), 10);
    store(&engine, ThreadId(3), 10);

    assert!(engine.detected_races() >= 1);
    let report = engine.teardown();
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].address, Address(element(10)));
    assert_eq!(report.findings[0].owner, MAIN);
    assert_eq!(report.hotspots[0].races, 1);
}

#[test]
fn test_protected_write_write_is_checked_but_ok() {
    let engine = engine_with_shared_heap(2);
    locked_store(&engine, ThreadId(2), 10);
    locked_store(&engine, ThreadId(3), 10);

    assert_eq!(engine.detected_races(), 0);
    assert_eq!(engine.checked_but_ok_races(), 1);
}

#[test]
fn test_read_write_races_but_read_read_does_not() {
    let engine = engine_with_shared_heap(2);
    load(&engine, ThreadId(2), 7);
    load(&engine, ThreadId(3), 7);
    assert_eq!(engine.detected_races(), 0);

    store(&engine, ThreadId(3), 7);
    // Only the other thread's read conflicts with the write
    assert_eq!(engine.detected_races(), 1);
}

#[test]
fn test_one_locked_side_is_still_a_race() {
    let engine = engine_with_shared_heap(2);
    locked_store(&engine, ThreadId(2), 3);
    store(&engine, ThreadId(3), 3);
    assert_eq!(engine.detected_races(), 1);
    assert_eq!(engine.checked_but_ok_races(), 0);
}

#[test]
fn test_disjoint_elements_do_not_conflict() {
    let engine = engine_with_shared_heap(2);
    store(&engine, ThreadId(2), 10);
    store(&engine, ThreadId(3), 11);
    assert_eq!(engine.detected_races(), 0);
}

#[test]
fn test_accesses_outside_allocations_are_not_logged() {
    let engine = engine_with_shared_heap(2);
    let past_end = HEAP + HEAP_INTS * 4;
    let outcome = engine
        .on_memory_access_batch(
            ThreadId(2),
            &[MemRef::write(past_end, 4), MemRef::write(0x1000, 4)],
        )
        .unwrap();
    engine.on_memory_access_batch(ThreadId(3), &[MemRef::write(past_end, 4)]).unwrap();

    assert_eq!(outcome.untracked, 2);
    assert_eq!(engine.with_thread(MAIN, |s| s.writes().len()), Some(0));
    assert_eq!(engine.current_timestamp(), Timestamp(0));
    assert_eq!(engine.detected_races(), 0);
}

#[test]
fn test_basic_multithread_scenario() {
    // Three workers store heap_storage[10] under mutex_g, one after another
    let engine = engine_with_shared_heap(3);
    for id in 2..5 {
        locked_store(&engine, ThreadId(id), 10);
    }

    assert_eq!(engine.detected_races(), 0);
    // One per compared cross-thread pair: (3,2), (4,2), (4,3)
    assert_eq!(engine.checked_but_ok_races(), 3);
}

#[test]
fn test_thread_capacity_rejects_extra_thread() {
    let engine = RaceEngine::new(EngineConfig { max_threads: 100, ..EngineConfig::default() });
    for id in 0..100 {
        assert_eq!(engine.on_thread_start(ThreadId(id)), ThreadAdmission::Accepted);
    }
    engine.on_allocation(Address(HEAP), 64, ThreadId(0));
    store(&engine, ThreadId(99), 0);

    assert_eq!(engine.on_thread_start(ThreadId(100)), ThreadAdmission::Rejected);
    assert_eq!(engine.thread_count(), 100);
    assert_eq!(engine.with_thread(ThreadId(0), |s| s.writes().len()), Some(1));

    // The rejected thread's events are discarded
    let outcome = engine.on_memory_access_batch(ThreadId(100), &[MemRef::write(HEAP, 4)]).unwrap();
    assert_eq!(outcome.discarded, 1);
    assert_eq!(engine.with_thread(ThreadId(0), |s| s.writes().len()), Some(1));
}

#[test]
fn test_concurrent_unlocked_writes_race() {
    let engine = engine_with_shared_heap(2);

    thread::scope(|scope| {
        for id in [2, 3] {
            let engine = &engine;
            scope.spawn(move || {
                for _ in 0..50 {
                    store(engine, ThreadId(id), 10);
                }
            });
        }
    });

    assert!(engine.detected_races() >= 1);
    assert_eq!(engine.stats().tracked_accesses, 100);
}

#[test]
fn test_concurrent_locked_writes_are_protected() {
    let engine = engine_with_shared_heap(2);
    let mutex_g = Mutex::new(());

    thread::scope(|scope| {
        for id in [2, 3] {
            let (engine, mutex_g) = (&engine, &mutex_g);
            scope.spawn(move || {
                for _ in 0..50 {
                    let _guard = mutex_g.lock().unwrap();
                    locked_store(engine, ThreadId(id), 10);
                }
            });
        }
    });

    assert_eq!(engine.detected_races(), 0);
    // Every write of one thread is compared once against every earlier write
    // of the other
    assert_eq!(engine.checked_but_ok_races(), 50 * 50);
}

#[test]
fn test_timestamps_strictly_increase_under_contention() {
    let engine = engine_with_shared_heap(8);

    thread::scope(|scope| {
        for id in 2..10 {
            let engine = &engine;
            scope.spawn(move || {
                for i in 0..200 {
                    store(engine, ThreadId(id), id * 200 + i);
                }
            });
        }
    });

    let writes = engine.with_thread(MAIN, |s| s.writes().to_vec()).unwrap();
    assert_eq!(writes.len(), 8 * 200);
    assert!(writes.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp));
    assert_eq!(engine.current_timestamp(), Timestamp(8 * 200));
    assert_eq!(engine.detected_races(), 0);
}
