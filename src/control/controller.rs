//! Lifecycle of one task kind
//!
//! ```text
//!   Idle --start--> Running --stop--> Stopping --loop exit--> Idle
//!                      \_______generator finished_______/
//! ```
//!
//! The phase lives in a `watch` channel so callers can await `Idle`. All
//! transitions out of `Idle` and into `Stopping` happen under the slot
//! lock; the transition back to `Idle` is made by the task's supervisor
//! once the loop has exited and the registry is cleared.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::TaskKind;
use crate::ingest::IngestSink;
use crate::simulation::run_loop::{RunExit, RunLoop, RunSummary};
use crate::trajectory::build_generator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Idle,
    Running,
    /// Stop requested, loop not yet exited
    Stopping,
}

impl TaskPhase {
    pub fn is_idle(self) -> bool {
        self == TaskPhase::Idle
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskPhase::Idle => "idle",
            TaskPhase::Running => "running",
            TaskPhase::Stopping => "stopping",
        };
        f.pad(s)
    }
}

/// Result of a control request. Lifecycle conflicts are outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlOutcome {
    Started,
    AlreadyRunning,
    Stopped,
    /// Stop was already requested; the loop has not exited yet
    AlreadyStopping,
    NotRunning,
    /// Stop-all: the kinds that were actually running
    StoppedSubset(Vec<TaskKind>),
}

impl fmt::Display for ControlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlOutcome::Started => f.write_str("started"),
            ControlOutcome::AlreadyRunning => f.write_str("already running"),
            ControlOutcome::Stopped => f.write_str("stopped"),
            ControlOutcome::AlreadyStopping => f.write_str("already stopping"),
            ControlOutcome::NotRunning => f.write_str("not running"),
            ControlOutcome::StoppedSubset(kinds) if kinds.is_empty() => f.write_str("nothing was running"),
            ControlOutcome::StoppedSubset(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                write!(f, "stopped {}", names.join(", "))
            }
        }
    }
}

#[derive(Default)]
struct Slot {
    cancel: Option<CancellationToken>,
    /// Bumped on every start so a late supervisor cannot reset a newer run
    generation: u64,
    last_run: Option<RunSummary>,
}

pub struct TaskController {
    kind: TaskKind,
    config: Arc<SimulationConfig>,
    sink: Arc<dyn IngestSink>,
    slot: Mutex<Slot>,
    phase: watch::Sender<TaskPhase>,
}

impl TaskController {
    pub fn new(kind: TaskKind, config: Arc<SimulationConfig>, sink: Arc<dyn IngestSink>) -> Self {
        let (phase, _) = watch::channel(TaskPhase::Idle);
        Self {
            kind,
            config,
            sink,
            slot: Mutex::new(Slot::default()),
            phase,
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn a fresh run on the current tokio runtime.
    ///
    /// Returns [`ControlOutcome::AlreadyRunning`] unless the task is `Idle`.
    /// A dataset or runtime error leaves the task `Idle`.
    pub fn start(self: &Arc<Self>) -> Result<ControlOutcome> {
        let mut slot = self.lock_slot();
        if !self.status().is_idle() {
            return Ok(ControlOutcome::AlreadyRunning);
        }

        let runtime = Handle::try_current().map_err(|e| SimError::StartFailed(self.kind, e.to_string()))?;
        let generator = build_generator(self.kind, &self.config)?;

        slot.generation += 1;
        let generation = slot.generation;
        let cancel = CancellationToken::new();
        slot.cancel = Some(cancel.clone());

        let run = RunLoop::new(
            self.kind,
            generator,
            Arc::clone(&self.sink),
            self.config.tick_interval(),
            self.config.inactivity_timeout_ticks(),
            cancel,
        );

        self.phase.send_replace(TaskPhase::Running);
        info!(task = %self.kind, generation, "Task started");

        let this = Arc::clone(self);
        let inner = runtime.clone();
        runtime.spawn(async move {
            let summary = match inner.spawn(run.run()).await {
                Ok(summary) => summary,
                Err(e) => {
                    error!(task = %this.kind, error = %e, "Task loop aborted");
                    RunSummary {
                        exit: RunExit::Panicked,
                        ..RunSummary::new(this.kind)
                    }
                }
            };
            this.finish(generation, summary);
        });

        Ok(ControlOutcome::Started)
    }

    /// Request a stop without waiting for the loop to exit.
    ///
    /// Only a `Running` task answers [`ControlOutcome::Stopped`].
    pub fn stop(&self) -> ControlOutcome {
        let slot = self.lock_slot();
        match self.status() {
            TaskPhase::Idle => return ControlOutcome::NotRunning,
            TaskPhase::Stopping => return ControlOutcome::AlreadyStopping,
            TaskPhase::Running => {}
        }
        if let Some(cancel) = &slot.cancel {
            cancel.cancel();
        }
        self.phase.send_replace(TaskPhase::Stopping);
        info!(task = %self.kind, "Stop requested");
        ControlOutcome::Stopped
    }

    pub fn status(&self) -> TaskPhase {
        *self.phase.borrow()
    }

    /// Resolves once the task is `Idle`
    pub async fn wait_idle(&self) {
        let mut rx = self.phase.subscribe();
        loop {
            if rx.borrow_and_update().is_idle() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// [`stop`](Self::stop), then wait for the loop to exit
    pub async fn stop_and_wait(&self) -> ControlOutcome {
        let outcome = self.stop();
        self.wait_idle().await;
        outcome
    }

    /// Summary of the most recent finished run
    pub fn last_run(&self) -> Option<RunSummary> {
        self.lock_slot().last_run.clone()
    }

    fn finish(&self, generation: u64, summary: RunSummary) {
        let mut slot = self.lock_slot();
        if slot.generation != generation {
            return;
        }
        slot.cancel = None;
        slot.last_run = Some(summary);
        self.phase.send_replace(TaskPhase::Idle);
        info!(task = %self.kind, "Task idle");
    }
}
