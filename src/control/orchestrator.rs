//! Facade over the five task controllers
//!
//! This is what a control surface (the console binary, or an HTTP layer in
//! front of it) calls. Every method is safe to call from any thread; the
//! `start*` methods need a tokio runtime context.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::control::controller::{ControlOutcome, TaskController, TaskPhase};
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::TaskKind;
use crate::ingest::IngestSink;
use crate::simulation::run_loop::RunSummary;

pub struct Orchestrator {
    controllers: BTreeMap<TaskKind, Arc<TaskController>>,
}

impl Orchestrator {
    pub fn new(config: SimulationConfig, sink: Arc<dyn IngestSink>) -> Self {
        let config = Arc::new(config);
        let controllers = TaskKind::ALL
            .into_iter()
            .map(|kind| {
                let controller = TaskController::new(kind, Arc::clone(&config), Arc::clone(&sink));
                (kind, Arc::new(controller))
            })
            .collect();
        Self { controllers }
    }

    fn controller(&self, kind: TaskKind) -> &Arc<TaskController> {
        &self.controllers[&kind]
    }

    pub fn start(&self, kind: TaskKind) -> Result<ControlOutcome> {
        self.controller(kind).start()
    }

    pub fn stop(&self, kind: TaskKind) -> ControlOutcome {
        self.controller(kind).stop()
    }

    pub fn status(&self, kind: TaskKind) -> TaskPhase {
        self.controller(kind).status()
    }

    pub fn last_run(&self, kind: TaskKind) -> Option<RunSummary> {
        self.controller(kind).last_run()
    }

    pub async fn stop_and_wait(&self, kind: TaskKind) -> ControlOutcome {
        self.controller(kind).stop_and_wait().await
    }

    /// Start every kind. One kind failing does not prevent the others.
    pub fn start_all(&self) -> BTreeMap<TaskKind, Result<ControlOutcome>> {
        self.controllers
            .iter()
            .map(|(kind, controller)| (*kind, controller.start()))
            .collect()
    }

    /// Stop whatever is running and report exactly those kinds
    pub fn stop_all(&self) -> ControlOutcome {
        let stopped: Vec<TaskKind> = self
            .controllers
            .iter()
            .filter(|(_, controller)| controller.stop() == ControlOutcome::Stopped)
            .map(|(kind, _)| *kind)
            .collect();
        info!(count = stopped.len(), "Stop-all");
        ControlOutcome::StoppedSubset(stopped)
    }

    /// Phase of every kind, always all five
    pub fn status_all(&self) -> BTreeMap<TaskKind, TaskPhase> {
        self.controllers
            .iter()
            .map(|(kind, controller)| (*kind, controller.status()))
            .collect()
    }

    /// Stop everything and wait until every loop has exited
    pub async fn shutdown(&self) {
        self.stop_all();
        for controller in self.controllers.values() {
            controller.wait_idle().await;
        }
        info!("All tasks idle");
    }
}
