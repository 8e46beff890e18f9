//! Task lifecycle control

pub mod controller;
pub mod orchestrator;

pub use controller::{ControlOutcome, TaskController, TaskPhase};
pub use orchestrator::Orchestrator;
