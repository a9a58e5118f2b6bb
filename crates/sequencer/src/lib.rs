//! Cancelable, resumable timed action sequences for fixed-tick simulations.
//!
//! An [`ActionSequence`] is an explicit step cursor: each [`Step`] runs an
//! optional enter effect, waits on a [`Wait`] condition, then runs an optional
//! exit effect. A [`Sequencer`] drives at most one active sequence forward by
//! one tick at a time, so long-running attack programs never block the
//! simulation loop.
//!
//! - **No blocking**: waits are elapsed-time counters or predicates re-checked
//!   every tick
//! - **Synchronous cancellation**: a cancelled sequence never runs another effect
//! - **Opaque effects**: the sequencer only does timing and bookkeeping; all
//!   domain logic lives in caller-supplied closures over a context `C`
//! - **Zero dependencies**: Pure Rust with no external crates
//!
//! # Architecture
//!
//! - [`Sequencer`]: drives the active sequence, issues [`SequenceHandle`]s
//! - [`ActionSequence`] / [`Step`]: immutable, shareable programs
//! - [`Wait`]: `Seconds`, `Until(predicate)`, or a `Race` of both
//! - [`SequenceBuilder`]: fluent construction with `repeat` and loops

pub mod builder;
pub mod sequence;
pub mod sequencer;
pub mod status;
pub mod step;
pub mod wait;

pub use builder::{SequenceBuilder, delay, instant};
pub use sequence::ActionSequence;
pub use sequencer::Sequencer;
pub use status::{Progress, SequenceHandle};
pub use step::{Effect, Step};
pub use wait::{Predicate, TIME_EPSILON, Wait, WaitOutcome};
