//! Engine-agnostic behavior logic for enemies and bosses.
//!
//! `game-core` defines how an agent decides what to do: data-driven
//! [`TransitionTable`]s per phase, timed attack programs ([`SequenceSpec`])
//! executed by the `sequencer` crate, one-shot health thresholds
//! ([`ThresholdDispatcher`]) and the [`PhaseController`] that swaps phase
//! machines. Everything the host engine provides (positions, physics,
//! animation, spawning) is reached through the [`Ports`] traits, so the same
//! logic runs under the async runtime, the CLI simulator, or a unit test.
//!
//! An [`Agent`] is spawned from a compiled [`Archetype`]; all state mutation
//! flows through [`Agent::tick`], [`Agent::report`] and [`Agent::apply_damage`].
pub mod action;
pub mod agent;
pub mod archetype;
pub mod body;
pub mod config;
pub mod error;
pub mod events;
pub mod facts;
pub mod guard;
pub mod machine;
pub mod phase;
pub mod ports;
pub mod threshold;
pub mod types;

pub use action::{Action, Repeat, SequenceSpec, StepSpec, WaitSpec};
pub use agent::{Agent, AgentSnapshot, SpawnOptions};
pub use archetype::{Archetype, ArchetypeSpec, DeathSpec, PatrolSpec, PhaseSpec, ThresholdSpec};
pub use body::AgentBody;
pub use config::EngineConfig;
pub use error::{EngineError, ErrorSeverity, GameError, Reference, SpecError};
pub use events::AgentEvent;
pub use facts::{Facts, TargetFacts};
pub use guard::Guard;
pub use machine::{
    CompiledState, CompiledTable, Movement, Origin, StateMachine, StateSpec, Transition,
    TransitionTable,
};
pub use phase::{Phase, PhaseController, Reaction, SpecialTrigger};
pub use ports::{
    Detached, MotionActuator, PortCall, Ports, PositionTable, PresentationSignal, Recorder,
    SpatialProvider, Spawner,
};
pub use threshold::{Threshold, ThresholdDispatcher};
pub use types::{AgentFlags, AgentId, BehaviorState, Health, Vec2};
