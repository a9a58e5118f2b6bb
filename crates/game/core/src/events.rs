//! Observable outcomes an agent reports to its surroundings.
use crate::types::{AgentId, BehaviorState};

/// Everything an agent did during a call into it, drained by the owner.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgentEvent {
    StateChanged {
        agent: AgentId,
        from: BehaviorState,
        to: BehaviorState,
    },
    SequenceStarted {
        agent: AgentId,
        handle: u64,
        name: String,
    },
    SequenceCompleted {
        agent: AgentId,
        handle: u64,
    },
    SequenceCancelled {
        agent: AgentId,
        handle: u64,
    },
    ThresholdCrossed {
        agent: AgentId,
        value: i32,
    },
    /// The active phase was disabled and `to` selected (its intro may still run).
    PhaseChanged {
        agent: AgentId,
        from: usize,
        to: usize,
        name: String,
    },
    /// The selected phase's machine started evaluating guards.
    PhaseEnabled {
        agent: AgentId,
        index: usize,
    },
    Damaged {
        agent: AgentId,
        amount: i32,
        health: i32,
    },
    DamageIgnored {
        agent: AgentId,
        amount: i32,
    },
    /// Damage this agent deals to another; routed by the world.
    DamageDealt {
        agent: AgentId,
        target: AgentId,
        amount: i32,
    },
    Healed {
        agent: AgentId,
        health: i32,
    },
    Spawned {
        agent: AgentId,
        prefab: String,
        entity: AgentId,
    },
    Died {
        agent: AgentId,
    },
    Despawned {
        agent: AgentId,
    },
}

impl AgentEvent {
    pub fn agent(&self) -> AgentId {
        match self {
            Self::StateChanged { agent, .. }
            | Self::SequenceStarted { agent, .. }
            | Self::SequenceCompleted { agent, .. }
            | Self::SequenceCancelled { agent, .. }
            | Self::ThresholdCrossed { agent, .. }
            | Self::PhaseChanged { agent, .. }
            | Self::PhaseEnabled { agent, .. }
            | Self::Damaged { agent, .. }
            | Self::DamageIgnored { agent, .. }
            | Self::DamageDealt { agent, .. }
            | Self::Healed { agent, .. }
            | Self::Spawned { agent, .. }
            | Self::Died { agent }
            | Self::Despawned { agent } => *agent,
        }
    }
}
