//! Feeding recorded traces into the engine
//!
//! Two modes:
//! - **Sequential**: every event applied in file order on the calling thread.
//!   Deterministic; the race counters depend only on the trace.
//! - **Parallel**: one worker per target thread, fed over crossbeam channels.
//!   Per-thread order is kept but threads interleave freely, the way the
//!   engine sees a live multi-threaded target.

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info};
use racewatch_common::MemRef;
use std::collections::HashMap;
use std::thread;

use super::trace_data::{TraceData, TraceEvent};
use crate::domain::{ReplayError, ThreadId};
use crate::engine::RaceEngine;

/// Events buffered per replay worker before the reader blocks
const WORKER_QUEUE_CAPACITY: usize = 1000;

/// What a replay run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    /// Worker threads spawned (0 for sequential replay)
    pub workers: usize,
}

pub struct Replayer<'a> {
    engine: &'a RaceEngine,
}

impl<'a> Replayer<'a> {
    #[must_use]
    pub fn new(engine: &'a RaceEngine) -> Self {
        Self { engine }
    }

    /// Apply every event in file order.
    ///
    /// # Errors
    /// Stops at the first rejected thread or fatal engine error.
    pub fn sequential(&self, trace: &TraceData) -> Result<ReplaySummary, ReplayError> {
        for event in &trace.events {
            apply_event(self.engine, event)?;
        }
        info!("Replayed {} events sequentially", trace.event_count());
        Ok(ReplaySummary { events: trace.event_count(), workers: 0 })
    }

    /// Apply events from one worker per target thread.
    ///
    /// Thread starts and allocations are applied on the reader thread so
    /// every worker sees an allocation from its position in the file on.
    /// Before applying one, the reader waits for the issuing thread's worker
    /// to drain, so that thread's earlier events still land first.
    ///
    /// # Errors
    /// A rejected thread stops the reader; the first worker error or panic
    /// is reported once every worker has drained.
    pub fn parallel(&self, trace: &TraceData) -> Result<ReplaySummary, ReplayError> {
        let engine = self.engine;

        thread::scope(|scope| {
            let mut senders: HashMap<ThreadId, Sender<WorkerMessage>> = HashMap::new();
            let mut workers = Vec::new();
            let mut result = Ok(());

            for event in &trace.events {
                let thread = event.thread();

                if matches!(event, TraceEvent::ThreadStart { .. } | TraceEvent::Alloc { .. }) {
                    if let Some(sender) = senders.get(&thread) {
                        drain_worker(sender);
                    }
                    if let Err(e) = apply_event(engine, event) {
                        result = Err(e);
                        break;
                    }
                    continue;
                }

                let sender = senders.entry(thread).or_insert_with(|| {
                    let (tx, rx) = bounded(WORKER_QUEUE_CAPACITY);
                    debug!("Spawning replay worker for {thread}");
                    workers.push((thread, scope.spawn(move || run_worker(engine, &rx))));
                    tx
                });
                // A closed channel means the worker already failed; its
                // result is collected below.
                let _ = sender.send(WorkerMessage::Event(event));
            }

            // Closing the channels lets workers finish
            drop(senders);

            let worker_count = workers.len();
            for (thread, handle) in workers {
                let worker_result = handle
                    .join()
                    .unwrap_or_else(|_| Err(ReplayError::WorkerPanicked(thread)));
                if result.is_ok() {
                    result = worker_result;
                }
            }

            result?;
            info!(
                "Replayed {} events on {worker_count} workers",
                trace.event_count()
            );
            Ok(ReplaySummary { events: trace.event_count(), workers: worker_count })
        })
    }
}

/// Queue entry for a replay worker
enum WorkerMessage<'t> {
    Event(&'t TraceEvent),
    /// Acknowledge once every earlier event has been applied
    Drain(Sender<()>),
}

/// Block until the worker behind `sender` has applied everything queued so
/// far. Returns early if the worker already stopped.
fn drain_worker(sender: &Sender<WorkerMessage>) {
    let (ack_tx, ack_rx) = bounded(1);
    if sender.send(WorkerMessage::Drain(ack_tx)).is_ok() {
        let _ = ack_rx.recv();
    }
}

fn run_worker(engine: &RaceEngine, messages: &Receiver<WorkerMessage>) -> Result<(), ReplayError> {
    for message in messages {
        match message {
            WorkerMessage::Event(event) => apply_event(engine, event)?,
            WorkerMessage::Drain(ack) => {
                let _ = ack.send(());
            }
        }
    }
    Ok(())
}

fn apply_event(engine: &RaceEngine, event: &TraceEvent) -> Result<(), ReplayError> {
    match event {
        TraceEvent::ThreadStart { thread } => {
            if !engine.on_thread_start(*thread).is_accepted() {
                return Err(ReplayError::ThreadRejected(*thread));
            }
        }
        TraceEvent::ThreadEnd { thread } => engine.on_thread_end(*thread),
        TraceEvent::Alloc { thread, address, size } => {
            engine.on_allocation(*address, *size, *thread);
        }
        TraceEvent::Lock { thread, address } => engine.on_lock_acquire(*address, *thread),
        TraceEvent::Unlock { thread, address } => engine.on_lock_release(*address, *thread),
        TraceEvent::Access { thread, accesses } => {
            let refs: Vec<MemRef> = accesses.iter().copied().map(MemRef::from).collect();
            engine.on_memory_access_batch(*thread, &refs)?;
        }
    }
    Ok(())
}
