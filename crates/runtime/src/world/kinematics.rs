//! Minimal motion integration for agents hosted by a [`World`](super::World).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use game_core::{AgentId, MotionActuator, PositionTable, SpatialProvider, Vec2};

/// Turns velocity intents and impulses into positions.
///
/// Impulses add to the current velocity and last until the next intent
/// overwrites it.
#[derive(Debug)]
pub struct Kinematics {
    positions: Arc<PositionTable>,
    velocities: Mutex<BTreeMap<AgentId, Vec2>>,
}

impl Kinematics {
    pub fn new(positions: Arc<PositionTable>) -> Self {
        Self {
            positions,
            velocities: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn velocity(&self, agent: AgentId) -> Vec2 {
        self.lock().get(&agent).copied().unwrap_or(Vec2::ZERO)
    }

    /// Moves every agent with a known position by `velocity * dt`.
    pub fn integrate(&self, dt: f32) {
        for (agent, velocity) in self.lock().iter() {
            if let Some(position) = self.positions.position(*agent) {
                self.positions.place(*agent, position + *velocity * dt);
            }
        }
    }

    pub fn forget(&self, agent: AgentId) {
        self.lock().remove(&agent);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AgentId, Vec2>> {
        self.velocities
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MotionActuator for Kinematics {
    fn set_velocity_intent(&self, agent: AgentId, velocity: Vec2) {
        self.lock().insert(agent, velocity);
    }

    fn apply_impulse(&self, agent: AgentId, impulse: Vec2) {
        let mut velocities = self.lock();
        let velocity = velocities.entry(agent).or_insert(Vec2::ZERO);
        *velocity = *velocity + impulse;
    }

    fn set_facing(&self, _agent: AgentId, _facing_right: bool) {}

    fn teleport(&self, agent: AgentId, position: Vec2) {
        self.positions.place(agent, position);
        self.lock().insert(agent, Vec2::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulses_stack_until_the_next_intent() {
        let positions = Arc::new(PositionTable::new());
        let agent = AgentId(1);
        positions.place(agent, Vec2::ZERO);
        let kinematics = Kinematics::new(positions.clone());

        kinematics.set_velocity_intent(agent, Vec2::new(1.0, 0.0));
        kinematics.apply_impulse(agent, Vec2::new(2.0, 0.0));
        kinematics.integrate(0.5);
        assert_eq!(positions.position(agent), Some(Vec2::new(1.5, 0.0)));

        kinematics.set_velocity_intent(agent, Vec2::ZERO);
        kinematics.integrate(0.5);
        assert_eq!(positions.position(agent), Some(Vec2::new(1.5, 0.0)));
    }

    #[test]
    fn teleport_places_and_halts() {
        let positions = Arc::new(PositionTable::new());
        let agent = AgentId(2);
        let kinematics = Kinematics::new(positions.clone());
        kinematics.set_velocity_intent(agent, Vec2::new(3.0, 0.0));

        kinematics.teleport(agent, Vec2::new(10.0, 2.0));
        kinematics.integrate(1.0);
        assert_eq!(positions.position(agent), Some(Vec2::new(10.0, 2.0)));
        assert_eq!(kinematics.velocity(agent), Vec2::ZERO);
    }
}
