//! Tick-driven execution of one task: clock, object registry and run loop

pub mod clock;
pub mod object;
pub mod registry;
pub mod run_loop;

pub use clock::{TickOutcome, Ticker};
pub use object::{ObjectUpdate, RemovalReason, SimulatedObject};
pub use registry::{ObjectRegistry, UpsertStats};
pub use run_loop::{RunExit, RunLoop, RunSummary};
