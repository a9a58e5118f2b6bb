//! Worker tasks that back the runtime orchestration.
//!
//! The simulation worker owns the [`World`](crate::world::World) and is the
//! only place it is mutated once a runtime is running.

mod simulation;

pub use simulation::{Command, SimulationWorker};
