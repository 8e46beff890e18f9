//! Per-task run loop
//!
//! Each tick:
//! 1. wait for the ticker (cancellation ends the run here)
//! 2. ask the generator for the tick's updates
//! 3. deliver the tick's raw radar points
//! 4. upsert updates, apply explicit retirements, sweep idle objects
//! 5. deliver the active set plus removals, if anything changed
//! 6. once a batch is accepted, suggest a classification for each new
//!    object that carries a suggestion reason (once per object per run)
//! 7. stop if the generator is finished
//!
//! The registry is cleared when the loop exits, whatever the reason.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashSet;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::types::{ObjectId, TaskKind, Tick};
use crate::ingest::{ClassificationSuggestion, IngestBatch, IngestSink, RadarPoint};
use crate::simulation::clock::{TickOutcome, Ticker};
use crate::simulation::object::RemovalReason;
use crate::simulation::registry::ObjectRegistry;
use crate::trajectory::TrajectoryGenerator;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunExit {
    /// Stop was requested
    Cancelled,
    /// The generator ran out of work
    Completed,
    /// The loop panicked; the supervisor recovered the task
    Panicked,
}

impl fmt::Display for RunExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunExit::Cancelled => "cancelled",
            RunExit::Completed => "completed",
            RunExit::Panicked => "panicked",
        };
        f.write_str(s)
    }
}

/// Counters for one finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub task: TaskKind,
    pub ticks: Tick,
    pub batches_sent: u64,
    /// Radar points accepted by the sink
    pub radar_points: u64,
    /// Classification suggestions accepted by the sink
    pub suggestions: u64,
    /// Failed deliveries of any kind
    pub failed_sends: u64,
    /// Objects removed on the generator's request
    pub retired: u64,
    /// Objects removed by the inactivity sweep
    pub expired: u64,
    pub exit: RunExit,
}

impl RunSummary {
    pub fn new(task: TaskKind) -> Self {
        Self {
            task,
            ticks: 0,
            batches_sent: 0,
            radar_points: 0,
            suggestions: 0,
            failed_sends: 0,
            retired: 0,
            expired: 0,
            exit: RunExit::Cancelled,
        }
    }
}

pub struct RunLoop {
    task: TaskKind,
    generator: Box<dyn TrajectoryGenerator>,
    registry: ObjectRegistry,
    sink: Arc<dyn IngestSink>,
    ticker: Ticker,
    timeout_ticks: Tick,
    suggested: AHashSet<ObjectId>,
}

impl RunLoop {
    pub fn new(
        task: TaskKind,
        generator: Box<dyn TrajectoryGenerator>,
        sink: Arc<dyn IngestSink>,
        tick_interval: Duration,
        timeout_ticks: Tick,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task,
            generator,
            registry: ObjectRegistry::new(),
            sink,
            ticker: Ticker::new(tick_interval, cancel),
            timeout_ticks,
            suggested: AHashSet::new(),
        }
    }

    pub async fn run(mut self) -> RunSummary {
        let mut summary = RunSummary::new(self.task);
        info!(
            task = %self.task,
            object_kind = ?self.generator.object_kind(),
            interval_ms = self.ticker.interval().as_millis() as u64,
            timeout_ticks = self.timeout_ticks,
            "Task loop starting"
        );

        loop {
            let tick = match self.ticker.next_tick().await {
                TickOutcome::Tick(tick) => tick,
                TickOutcome::Cancelled => {
                    summary.exit = RunExit::Cancelled;
                    break;
                }
            };
            summary.ticks = tick;

            let finished = self.step(tick, &mut summary).await;
            if finished {
                summary.exit = RunExit::Completed;
                break;
            }
        }

        self.registry.clear();
        info!(
            task = %self.task,
            exit = %summary.exit,
            ticks = summary.ticks,
            sent = summary.batches_sent,
            radar_points = summary.radar_points,
            suggestions = summary.suggestions,
            failed = summary.failed_sends,
            retired = summary.retired,
            expired = summary.expired,
            "Task loop exited"
        );
        summary
    }

    /// One tick of work. Returns true when the generator is finished.
    async fn step(&mut self, tick: Tick, summary: &mut RunSummary) -> bool {
        let output = self.generator.produce(tick);
        let changed = !output.is_empty();

        for position in &output.radar_points {
            match self.sink.radar_point(&RadarPoint::from(position)).await {
                Ok(()) => summary.radar_points += 1,
                Err(e) => {
                    summary.failed_sends += 1;
                    warn!(task = %self.task, tick, error = %e, "Radar point delivery failed");
                }
            }
        }

        let stats = self.registry.upsert(output.updates, tick);

        let (ids, reasons): (Vec<ObjectId>, Vec<RemovalReason>) = output.retired.into_iter().unzip();
        let present = self.registry.retire(&ids);
        let mut removed: Vec<(ObjectId, RemovalReason)> = ids
            .into_iter()
            .zip(reasons)
            .filter(|(id, _)| present.contains(id))
            .collect();
        summary.retired += removed.len() as u64;

        let expired = self.registry.sweep(tick, self.timeout_ticks);
        summary.expired += expired.len() as u64;
        removed.extend(expired.into_iter().map(|id| (id, RemovalReason::Inactive)));

        debug!(
            task = %self.task,
            tick,
            inserted = stats.inserted,
            refreshed = stats.refreshed,
            removed = removed.len(),
            live = self.registry.len(),
            "Tick"
        );

        if changed || !removed.is_empty() {
            let batch = IngestBatch::new(self.task, tick, &self.registry.snapshot(), &removed);
            match self.sink.send(&batch).await {
                Ok(()) => {
                    summary.batches_sent += 1;
                    self.suggest_new(&batch, summary).await;
                }
                Err(e) => {
                    summary.failed_sends += 1;
                    warn!(task = %self.task, tick, error = %e, "Batch delivery failed");
                }
            }
        }

        output.finished
    }

    /// A suggestion is attempted once per object, even if it fails
    async fn suggest_new(&mut self, batch: &IngestBatch, summary: &mut RunSummary) {
        for record in &batch.objects {
            if self.suggested.contains(&record.id) {
                continue;
            }
            let Some(suggestion) = ClassificationSuggestion::from_record(self.task, record) else {
                continue;
            };
            self.suggested.insert(record.id.clone());
            match self.sink.suggest(&suggestion).await {
                Ok(()) => {
                    summary.suggestions += 1;
                    info!(task = %self.task, id = %record.id, "Classification suggested");
                }
                Err(e) => {
                    summary.failed_sends += 1;
                    warn!(task = %self.task, id = %record.id, error = %e, "Classification suggestion failed");
                }
            }
        }
    }
}
