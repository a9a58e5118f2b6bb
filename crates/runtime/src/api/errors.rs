//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination and content lookup so clients can
//! bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use game_core::{AgentId, SpecError};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("agent {0} is not part of the world")]
    UnknownAgent(AgentId),

    #[error("agent id {0} is already taken")]
    AgentExists(AgentId),

    #[error("no archetype named `{0}` is registered")]
    UnknownArchetype(String),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("tick rate must be at least 1 Hz")]
    InvalidTickRate,

    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}
