//! Event payloads carried on the bus.

use game_core::{AgentEvent, AgentId};
use serde::{Deserialize, Serialize};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// State changes and sequence lifecycle
    Behavior,
    /// Damage, thresholds and phase changes
    Combat,
    /// Death and despawn
    Lifecycle,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Behavior, Topic::Combat, Topic::Lifecycle];

    pub(crate) const fn index(self) -> usize {
        match self {
            Topic::Behavior => 0,
            Topic::Combat => 1,
            Topic::Lifecycle => 2,
        }
    }

    /// Topic an agent event is published on.
    pub fn of(event: &AgentEvent) -> Self {
        match event {
            AgentEvent::StateChanged { .. }
            | AgentEvent::SequenceStarted { .. }
            | AgentEvent::SequenceCompleted { .. }
            | AgentEvent::SequenceCancelled { .. }
            | AgentEvent::Spawned { .. } => Topic::Behavior,
            AgentEvent::ThresholdCrossed { .. }
            | AgentEvent::PhaseChanged { .. }
            | AgentEvent::PhaseEnabled { .. }
            | AgentEvent::Damaged { .. }
            | AgentEvent::DamageIgnored { .. }
            | AgentEvent::DamageDealt { .. }
            | AgentEvent::Healed { .. } => Topic::Combat,
            AgentEvent::Died { .. } | AgentEvent::Despawned { .. } => Topic::Lifecycle,
        }
    }
}

/// An agent event stamped with the world tick that drained it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub tick: u64,
    pub payload: AgentEvent,
}

impl Event {
    pub fn new(tick: u64, payload: AgentEvent) -> Self {
        Self { tick, payload }
    }

    pub fn topic(&self) -> Topic {
        Topic::of(&self.payload)
    }

    pub fn agent(&self) -> AgentId {
        self.payload.agent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combat_and_lifecycle_events_are_split() {
        let hit = AgentEvent::Damaged {
            agent: AgentId(1),
            amount: 10,
            health: 90,
        };
        let died = AgentEvent::Died { agent: AgentId(1) };
        assert_eq!(Topic::of(&hit), Topic::Combat);
        assert_eq!(Topic::of(&died), Topic::Lifecycle);
        assert_eq!(Event::new(3, died).agent(), AgentId(1));
    }

    #[test]
    fn events_serialize_with_their_tick() {
        let event = Event::new(
            7,
            AgentEvent::ThresholdCrossed {
                agent: AgentId(2),
                value: 250,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"tick\":7"));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
