//! Common error infrastructure for game-core.
//!
//! Runtime faults ([`EngineError`]) never abort an agent: callers log them and
//! fall back to a safe state. Archetype data problems ([`SpecError`]) are
//! reported once, when an archetype is compiled.
//!
//! Two failure modes are structurally impossible and therefore have no
//! variant: cancelling a sequence that already finished is a no-op
//! (`Sequencer::cancel` returns `false`), and a threshold can never fire twice
//! because it carries its own `fired` flag.

use crate::types::{AgentId, BehaviorState};

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - the agent degrades to a safe state and keeps going.
    ///
    /// Examples: target not found, spawn point missing
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: malformed archetype data
    Validation,

    /// Internal error - unexpected state inconsistency.
    ///
    /// Examples: a transition requested out of the terminal state
    Internal,

    /// Fatal error - the agent cannot continue.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all game-core errors.
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// An external collaborator an agent needed but could not resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reference {
    /// The agent's own position.
    Position,
    /// The target agent.
    Target(AgentId),
    /// A spawn point or prefab the spawner could not provide.
    Spawn(String),
    /// The archetype declares no waypoints.
    Waypoint,
}

impl core::fmt::Display for Reference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Position => f.write_str("own position"),
            Self::Target(id) => write!(f, "target {id}"),
            Self::Spawn(prefab) => write!(f, "spawn of '{prefab}'"),
            Self::Waypoint => f.write_str("waypoint"),
        }
    }
}

/// Faults raised while an agent runs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EngineError {
    #[error("agent {agent}: missing {reference}")]
    MissingReference { agent: AgentId, reference: Reference },

    #[error("agent {agent}: illegal transition {from} -> {to}")]
    InvalidTransition {
        agent: AgentId,
        from: BehaviorState,
        to: BehaviorState,
    },

    #[error("agent {agent}: no phase at index {index}")]
    UnknownPhase { agent: AgentId, index: usize },

    #[error("agent {agent}: state {state} is not in the active transition table")]
    UnknownState { agent: AgentId, state: BehaviorState },
}

impl GameError for EngineError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingReference { .. } => ErrorSeverity::Recoverable,
            Self::InvalidTransition { .. } => ErrorSeverity::Internal,
            Self::UnknownPhase { .. } | Self::UnknownState { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingReference { .. } => "ENGINE_MISSING_REFERENCE",
            Self::InvalidTransition { .. } => "ENGINE_INVALID_TRANSITION",
            Self::UnknownPhase { .. } => "ENGINE_UNKNOWN_PHASE",
            Self::UnknownState { .. } => "ENGINE_UNKNOWN_STATE",
        }
    }
}

/// Invalid archetype data, reported by [`crate::ArchetypeSpec::validate`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SpecError {
    #[error("archetype '{archetype}': max health must be positive (got {maximum})")]
    InvalidHealth { archetype: String, maximum: i32 },

    #[error("archetype '{archetype}': at least one phase is required")]
    NoPhases { archetype: String },

    #[error("archetype '{archetype}', phase '{phase}': state {state} is referenced but not defined")]
    UnknownState {
        archetype: String,
        phase: String,
        state: BehaviorState,
    },

    #[error("archetype '{archetype}', phase '{phase}': state {state} is defined twice")]
    DuplicateState {
        archetype: String,
        phase: String,
        state: BehaviorState,
    },

    #[error("archetype '{archetype}': threshold at {value} advances to missing phase {index}")]
    UnknownPhase {
        archetype: String,
        value: i32,
        index: usize,
    },

    #[error("archetype '{archetype}': sequence '{sequence}' has no steps")]
    EmptySequence { archetype: String, sequence: String },

    #[error("archetype '{archetype}': sequence '{sequence}' repeats forever but declares outro steps")]
    UnreachableOutro { archetype: String, sequence: String },

    #[error("archetype '{archetype}': sequence '{sequence}' unrolls to {steps} steps (limit {limit})")]
    RepeatTooLarge {
        archetype: String,
        sequence: String,
        steps: u64,
        limit: usize,
    },

    #[error("archetype '{archetype}': '{context}' has a negative duration ({seconds}s)")]
    NegativeDuration {
        archetype: String,
        context: String,
        seconds: f32,
    },
}

impl GameError for SpecError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidHealth { .. } => "SPEC_INVALID_HEALTH",
            Self::NoPhases { .. } => "SPEC_NO_PHASES",
            Self::UnknownState { .. } => "SPEC_UNKNOWN_STATE",
            Self::DuplicateState { .. } => "SPEC_DUPLICATE_STATE",
            Self::UnknownPhase { .. } => "SPEC_UNKNOWN_PHASE",
            Self::EmptySequence { .. } => "SPEC_EMPTY_SEQUENCE",
            Self::UnreachableOutro { .. } => "SPEC_UNREACHABLE_OUTRO",
            Self::RepeatTooLarge { .. } => "SPEC_REPEAT_TOO_LARGE",
            Self::NegativeDuration { .. } => "SPEC_NEGATIVE_DURATION",
        }
    }
}
