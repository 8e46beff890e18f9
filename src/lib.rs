//! Tracksim - synthetic target simulation engine
//!
//! Runs up to five independent simulation tasks (radar noise, decoys,
//! scripted flights, drone and rocket attack profiles). Each task ticks on
//! its own tokio task, keeps a registry of live objects, and streams the
//! active set to a tracking service after every tick that changed it.

pub mod control;
pub mod core;
pub mod ingest;
pub mod simulation;
pub mod trajectory;

pub use crate::control::{ControlOutcome, Orchestrator, TaskPhase};
pub use crate::core::config::SimulationConfig;
pub use crate::core::types::TaskKind;
