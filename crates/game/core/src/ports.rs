//! Narrow interfaces to the collaborators an agent drives but never owns.
//!
//! Physics, rendering, audio and spawning live outside the engine. Agents
//! receive a [`Ports`] bundle at spawn time and call through it; nothing is
//! looked up through globals.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use crate::types::{AgentId, Vec2};

/// Read-only spatial facts about agents.
pub trait SpatialProvider: Send + Sync {
    fn position(&self, agent: AgentId) -> Option<Vec2>;

    fn distance_to(&self, from: AgentId, target: AgentId) -> Option<f32> {
        Some(self.position(from)?.distance(self.position(target)?))
    }

    /// Ground contact as reported by the physics collaborator.
    fn is_grounded(&self, _agent: AgentId) -> bool {
        true
    }
}

/// Fire-and-forget motion requests.
pub trait MotionActuator: Send + Sync {
    fn set_velocity_intent(&self, agent: AgentId, velocity: Vec2);
    fn apply_impulse(&self, agent: AgentId, impulse: Vec2);
    fn set_facing(&self, agent: AgentId, facing_right: bool);
    fn teleport(&self, _agent: AgentId, _position: Vec2) {}
}

/// Fire-and-forget animation and audio signals.
pub trait PresentationSignal: Send + Sync {
    fn set_animator_bool(&self, agent: AgentId, name: &str, value: bool);
    fn fire_animator_trigger(&self, agent: AgentId, name: &str);
    fn play_sound(&self, agent: AgentId, name: &str);
    fn stop_sound(&self, agent: AgentId, name: &str);
}

/// Creates projectiles and summons on behalf of an agent.
pub trait Spawner: Send + Sync {
    /// Returns `None` when the prefab or spawn point is unavailable.
    fn spawn(&self, owner: AgentId, prefab: &str, position: Vec2, rotation: f32)
    -> Option<AgentId>;

    /// Number of entities spawned by `owner` that are still alive.
    fn live_spawns(&self, owner: AgentId) -> usize;
}

/// The collaborator set injected into every agent.
#[derive(Clone)]
pub struct Ports {
    pub spatial: Arc<dyn SpatialProvider>,
    pub motion: Arc<dyn MotionActuator>,
    pub presentation: Arc<dyn PresentationSignal>,
    pub spawner: Arc<dyn Spawner>,
}

impl Ports {
    /// Ports that accept every call and know nothing about the world.
    pub fn detached() -> Self {
        let detached = Arc::new(Detached);
        Self {
            spatial: detached.clone(),
            motion: detached.clone(),
            presentation: detached.clone(),
            spawner: detached,
        }
    }

    pub fn with_spatial(mut self, spatial: Arc<dyn SpatialProvider>) -> Self {
        self.spatial = spatial;
        self
    }

    pub fn with_motion(mut self, motion: Arc<dyn MotionActuator>) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_presentation(mut self, presentation: Arc<dyn PresentationSignal>) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Routes motion, presentation and spawning to one recorder.
    pub fn recorded(recorder: Arc<Recorder>) -> Self {
        Self::detached()
            .with_motion(recorder.clone())
            .with_presentation(recorder.clone())
            .with_spawner(recorder)
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self::detached()
    }
}

impl fmt::Debug for Ports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ports").finish_non_exhaustive()
    }
}

/// No-op implementation of every port.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl SpatialProvider for Detached {
    fn position(&self, _agent: AgentId) -> Option<Vec2> {
        None
    }
}

impl MotionActuator for Detached {
    fn set_velocity_intent(&self, _agent: AgentId, _velocity: Vec2) {}
    fn apply_impulse(&self, _agent: AgentId, _impulse: Vec2) {}
    fn set_facing(&self, _agent: AgentId, _facing_right: bool) {}
}

impl PresentationSignal for Detached {
    fn set_animator_bool(&self, _agent: AgentId, _name: &str, _value: bool) {}
    fn fire_animator_trigger(&self, _agent: AgentId, _name: &str) {}
    fn play_sound(&self, _agent: AgentId, _name: &str) {}
    fn stop_sound(&self, _agent: AgentId, _name: &str) {}
}

impl Spawner for Detached {
    fn spawn(&self, _owner: AgentId, _prefab: &str, _position: Vec2, _rotation: f32) -> Option<AgentId> {
        None
    }

    fn live_spawns(&self, _owner: AgentId) -> usize {
        0
    }
}

/// Shared position table usable as a [`SpatialProvider`].
///
/// Whoever integrates movement writes positions here; agents only read.
#[derive(Debug, Default)]
pub struct PositionTable {
    positions: RwLock<BTreeMap<AgentId, Vec2>>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&self, agent: AgentId, position: Vec2) {
        self.positions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(agent, position);
    }

    pub fn remove(&self, agent: AgentId) -> Option<Vec2> {
        self.positions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&agent)
    }
}

impl SpatialProvider for PositionTable {
    fn position(&self, agent: AgentId) -> Option<Vec2> {
        self.positions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&agent)
            .copied()
    }
}

/// One call received by a [`Recorder`].
#[derive(Clone, Debug, PartialEq)]
pub enum PortCall {
    Velocity { agent: AgentId, velocity: Vec2 },
    Impulse { agent: AgentId, impulse: Vec2 },
    Facing { agent: AgentId, facing_right: bool },
    Teleport { agent: AgentId, position: Vec2 },
    AnimatorBool { agent: AgentId, name: String, value: bool },
    Trigger { agent: AgentId, name: String },
    PlaySound { agent: AgentId, name: String },
    StopSound { agent: AgentId, name: String },
    Spawn { owner: AgentId, prefab: String, entity: AgentId },
}

/// Records motion, presentation and spawn calls in order.
///
/// Spawned entities stay alive until [`Recorder::clear_spawns`] is called,
/// which stands in for the player defeating a summoned army.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<PortCall>>,
    spawned: Mutex<BTreeMap<AgentId, usize>>,
    next_entity: Mutex<u32>,
}

impl Recorder {
    /// First id handed out to spawned entities.
    pub const FIRST_SPAWN_ID: u32 = 10_000;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PortCall> {
        self.lock_calls().clone()
    }

    pub fn clear(&self) {
        self.lock_calls().clear();
    }

    /// Animator triggers fired by `agent`, in order.
    pub fn triggers(&self, agent: AgentId) -> Vec<String> {
        self.lock_calls()
            .iter()
            .filter_map(|call| match call {
                PortCall::Trigger { agent: a, name } if *a == agent => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Impulses applied to `agent`, in order.
    pub fn impulses(&self, agent: AgentId) -> Vec<Vec2> {
        self.lock_calls()
            .iter()
            .filter_map(|call| match call {
                PortCall::Impulse { agent: a, impulse } if *a == agent => Some(*impulse),
                _ => None,
            })
            .collect()
    }

    /// Most recent velocity intent for `agent`.
    pub fn last_velocity(&self, agent: AgentId) -> Option<Vec2> {
        self.lock_calls().iter().rev().find_map(|call| match call {
            PortCall::Velocity { agent: a, velocity } if *a == agent => Some(*velocity),
            _ => None,
        })
    }

    pub fn spawn_count(&self, owner: AgentId) -> usize {
        self.lock_calls()
            .iter()
            .filter(|call| matches!(call, PortCall::Spawn { owner: o, .. } if *o == owner))
            .count()
    }

    /// Marks every entity spawned by `owner` as defeated.
    pub fn clear_spawns(&self, owner: AgentId) {
        self.spawned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&owner);
    }

    fn record(&self, call: PortCall) {
        self.lock_calls().push(call);
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<PortCall>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MotionActuator for Recorder {
    fn set_velocity_intent(&self, agent: AgentId, velocity: Vec2) {
        self.record(PortCall::Velocity { agent, velocity });
    }

    fn apply_impulse(&self, agent: AgentId, impulse: Vec2) {
        self.record(PortCall::Impulse { agent, impulse });
    }

    fn set_facing(&self, agent: AgentId, facing_right: bool) {
        self.record(PortCall::Facing {
            agent,
            facing_right,
        });
    }

    fn teleport(&self, agent: AgentId, position: Vec2) {
        self.record(PortCall::Teleport { agent, position });
    }
}

impl PresentationSignal for Recorder {
    fn set_animator_bool(&self, agent: AgentId, name: &str, value: bool) {
        self.record(PortCall::AnimatorBool {
            agent,
            name: name.to_owned(),
            value,
        });
    }

    fn fire_animator_trigger(&self, agent: AgentId, name: &str) {
        self.record(PortCall::Trigger {
            agent,
            name: name.to_owned(),
        });
    }

    fn play_sound(&self, agent: AgentId, name: &str) {
        self.record(PortCall::PlaySound {
            agent,
            name: name.to_owned(),
        });
    }

    fn stop_sound(&self, agent: AgentId, name: &str) {
        self.record(PortCall::StopSound {
            agent,
            name: name.to_owned(),
        });
    }
}

impl Spawner for Recorder {
    fn spawn(&self, owner: AgentId, prefab: &str, _position: Vec2, _rotation: f32) -> Option<AgentId> {
        let entity = {
            let mut next = self
                .next_entity
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let entity = AgentId(Self::FIRST_SPAWN_ID + *next);
            *next += 1;
            entity
        };
        *self
            .spawned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(owner)
            .or_default() += 1;
        self.record(PortCall::Spawn {
            owner,
            prefab: prefab.to_owned(),
            entity,
        });
        Some(entity)
    }

    fn live_spawns(&self, owner: AgentId) -> usize {
        self.spawned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&owner)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_table_answers_distances() {
        let table = PositionTable::new();
        table.place(AgentId(1), Vec2::new(0.0, 0.0));
        table.place(AgentId::PLAYER, Vec2::new(3.0, 4.0));

        assert_eq!(table.distance_to(AgentId(1), AgentId::PLAYER), Some(5.0));
        assert_eq!(table.distance_to(AgentId(1), AgentId(9)), None);
    }

    #[test]
    fn recorder_tracks_live_spawns_until_cleared() {
        let recorder = Recorder::new();
        let owner = AgentId(3);
        recorder.spawn(owner, "skeleton", Vec2::ZERO, 0.0);
        recorder.spawn(owner, "skeleton", Vec2::ZERO, 0.0);

        assert_eq!(recorder.live_spawns(owner), 2);
        assert_eq!(recorder.spawn_count(owner), 2);

        recorder.clear_spawns(owner);
        assert_eq!(recorder.live_spawns(owner), 0);
        assert_eq!(recorder.spawn_count(owner), 2);
    }
}
