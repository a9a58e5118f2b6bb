//! Runtime orchestration for fixed-tick agent simulation.
//!
//! This crate hosts agents from `game-core` in a [`World`], advances them on
//! a background worker, and routes their events to subscribers. Consumers
//! embed [`Runtime`] and interact with it through [`RuntimeHandle`], or drive
//! a [`World`] directly when they own the loop.
//!
//! Modules are organized by responsibility:
//! - [`world`] owns agents, positions and cross-agent damage
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod events;
pub mod runtime;
pub mod world;

mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle};
pub use events::{Event, EventBus, Topic};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use world::{DeathObserver, Kinematics, Strike, TickReport, World, WorldSnapshot};
