//! Per-tick snapshot of what an agent can observe.
use crate::error::{EngineError, Reference};
use crate::ports::Ports;
use crate::types::{AgentId, Vec2};

/// What the agent knows about its target this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetFacts {
    pub id: AgentId,
    pub position: Vec2,
    pub distance: f32,
    /// Signed `target.x - own.x`.
    pub horizontal_offset: f32,
}

/// Read-only facts gathered once per tick, before guards run.
///
/// Missing references are not errors at this level: a target that cannot be
/// resolved is simply absent, and states that need one fall back to their
/// machine's safe state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Facts {
    pub position: Option<Vec2>,
    pub target: Option<TargetFacts>,
    pub grounded: bool,
}

impl Facts {
    /// Facts for an agent standing at `position` with no visible target.
    pub fn at(position: Vec2) -> Self {
        Self {
            position: Some(position),
            target: None,
            grounded: true,
        }
    }

    /// Adds a target at `position`. Requires a known own position.
    pub fn with_target(mut self, id: AgentId, position: Vec2) -> Self {
        if let Some(own) = self.position {
            self.target = Some(TargetFacts {
                id,
                position,
                distance: own.distance(position),
                horizontal_offset: position.x - own.x,
            });
        }
        self
    }

    pub fn airborne(mut self) -> Self {
        self.grounded = false;
        self
    }

    /// Queries the spatial provider for `agent` and its `target`.
    pub fn gather(agent: AgentId, target: AgentId, ports: &Ports) -> Self {
        let Some(position) = ports.spatial.position(agent) else {
            return Self::default();
        };

        let facts = Self {
            position: Some(position),
            target: None,
            grounded: ports.spatial.is_grounded(agent),
        };
        match ports.spatial.position(target) {
            Some(target_position) => facts.with_target(target, target_position),
            None => facts,
        }
    }

    /// The target, or the `MissingReference` explaining why there is none.
    pub fn require_target(&self, agent: AgentId, target: AgentId) -> Result<&TargetFacts, EngineError> {
        match (&self.position, &self.target) {
            (None, _) => Err(EngineError::MissingReference {
                agent,
                reference: Reference::Position,
            }),
            (Some(_), None) => Err(EngineError::MissingReference {
                agent,
                reference: Reference::Target(target),
            }),
            (Some(_), Some(found)) => Ok(found),
        }
    }

    pub fn target_distance(&self) -> Option<f32> {
        self.target.map(|target| target.distance)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ports::PositionTable;

    #[test]
    fn gather_reads_spatial_provider() {
        let table = Arc::new(PositionTable::new());
        table.place(AgentId(1), Vec2::new(2.0, 0.0));
        table.place(AgentId::PLAYER, Vec2::new(-1.0, 4.0));
        let ports = Ports::detached().with_spatial(table);

        let facts = Facts::gather(AgentId(1), AgentId::PLAYER, &ports);
        let target = facts.target.unwrap();
        assert_eq!(target.distance, 5.0);
        assert_eq!(target.horizontal_offset, -3.0);
    }

    #[test]
    fn missing_target_degrades_to_no_target() {
        let table = Arc::new(PositionTable::new());
        table.place(AgentId(1), Vec2::ZERO);
        let ports = Ports::detached().with_spatial(table);

        let facts = Facts::gather(AgentId(1), AgentId::PLAYER, &ports);
        assert!(facts.target.is_none());
        let err = facts.require_target(AgentId(1), AgentId::PLAYER).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingReference {
                reference: Reference::Target(AgentId::PLAYER),
                ..
            }
        ));
    }
}
