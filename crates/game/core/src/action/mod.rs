//! Data-driven side effects and waits for sequence steps.
//!
//! Archetypes describe their attack programs as plain data ([`Action`],
//! [`WaitSpec`], [`SequenceSpec`]) so they can be loaded from files. Compiling a
//! [`SequenceSpec`] turns it into a [`sequencer::ActionSequence`] whose effects
//! run against an [`AgentBody`].
mod sequence;

pub use sequence::{Repeat, SequenceSpec, StepSpec, WaitSpec};

use tracing::debug;

use crate::body::AgentBody;
use crate::error::Reference;
use crate::events::AgentEvent;
use crate::types::{AgentFlags, BehaviorState, Vec2};

/// One opaque side effect, executed through the agent's ports.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    /// Fire an animator trigger.
    Trigger(String),
    SetBool {
        name: String,
        value: bool,
    },
    PlaySound(String),
    StopSound(String),
    SetVelocity(Vec2),
    /// Zero the velocity intent.
    Stop,
    FaceTarget,
    Impulse(Vec2),
    /// Leap toward the target: `horizontal` along the target side, `vertical` up.
    ImpulseTowardTarget {
        horizontal: f32,
        vertical: f32,
    },
    /// Run toward the waypoint farthest from the agent.
    RunToFarthestWaypoint {
        speed: f32,
    },
    TeleportToFarthestWaypoint,
    /// Spawn `count` prefabs at the agent's position plus `offset`, aimed at the target.
    Spawn {
        prefab: String,
        count: u32,
        offset: Vec2,
    },
    /// Damage the target if it is within `range`.
    DealDamage {
        amount: i32,
        range: f32,
    },
    SetFlags(AgentFlags),
    ClearFlags(AgentFlags),
    /// Ask the state machine to move to another state.
    RequestState(BehaviorState),
    HealToFull,
    /// Drop to zero health through the thresholds; the death sequence is skipped.
    SelfDestruct,
    StartCooldown {
        name: String,
        seconds: f32,
    },
    /// Roll the patrol idle countdown within `[min, max)`.
    RollIdleInterval {
        min: f32,
        max: f32,
    },
}

impl Action {
    pub fn trigger(name: impl Into<String>) -> Self {
        Self::Trigger(name.into())
    }

    pub fn cooldown(name: impl Into<String>, seconds: f32) -> Self {
        Self::StartCooldown {
            name: name.into(),
            seconds,
        }
    }

    pub fn spawn(prefab: impl Into<String>, count: u32) -> Self {
        Self::Spawn {
            prefab: prefab.into(),
            count,
            offset: Vec2::ZERO,
        }
    }

    /// Applies the effect to `body`.
    pub fn apply(&self, body: &mut AgentBody) {
        match self {
            Self::Trigger(name) => {
                let id = body.id();
                body.ports().presentation.fire_animator_trigger(id, name);
            }
            Self::SetBool { name, value } => {
                let id = body.id();
                body.ports().presentation.set_animator_bool(id, name, *value);
            }
            Self::PlaySound(name) => {
                let id = body.id();
                body.ports().presentation.play_sound(id, name);
            }
            Self::StopSound(name) => {
                let id = body.id();
                body.ports().presentation.stop_sound(id, name);
            }
            Self::SetVelocity(velocity) => body.set_velocity(*velocity),
            Self::Stop => body.stop(),
            Self::FaceTarget => {
                if !body.face_target() {
                    body.report_missing(Reference::Target(body.target()));
                }
            }
            Self::Impulse(impulse) => body.apply_impulse(*impulse),
            Self::ImpulseTowardTarget {
                horizontal,
                vertical,
            } => match body.facts().target {
                Some(target) => {
                    let side = target.horizontal_offset.signum();
                    body.apply_impulse(Vec2::new(side * horizontal, *vertical));
                }
                None => body.report_missing(Reference::Target(body.target())),
            },
            Self::RunToFarthestWaypoint { speed } => {
                let own = body.facts().position;
                match (own, body.choose_farthest_waypoint()) {
                    (Some(own), Some(goal)) => {
                        body.set_velocity((goal - own).normalized() * *speed);
                    }
                    _ => body.report_missing(Reference::Waypoint),
                }
            }
            Self::TeleportToFarthestWaypoint => match body.choose_farthest_waypoint() {
                Some(goal) => body.teleport(goal),
                None => body.report_missing(Reference::Waypoint),
            },
            Self::Spawn {
                prefab,
                count,
                offset,
            } => spawn(body, prefab, *count, *offset),
            Self::DealDamage { amount, range } => {
                let Some(target) = body.facts().target else {
                    return;
                };
                if target.distance <= *range {
                    let agent = body.id();
                    body.emit(AgentEvent::DamageDealt {
                        agent,
                        target: target.id,
                        amount: *amount,
                    });
                } else {
                    debug!(
                        target: "game_core::action",
                        agent = %body.id(),
                        distance = target.distance,
                        range,
                        "attack missed"
                    );
                }
            }
            Self::SetFlags(flags) => body.insert_flags(*flags),
            Self::ClearFlags(flags) => body.remove_flags(*flags),
            Self::RequestState(state) => body.request_state(*state),
            Self::HealToFull => {
                let health = body.restore_health();
                let agent = body.id();
                body.emit(AgentEvent::Healed { agent, health });
            }
            Self::SelfDestruct => body.self_destruct(),
            Self::StartCooldown { name, seconds } => body.start_cooldown(name, *seconds),
            Self::RollIdleInterval { min, max } => body.roll_idle_interval(*min, *max),
        }
    }

    /// Durations carried by the action, for validation.
    pub(crate) fn durations(&self) -> Vec<f32> {
        match self {
            Self::StartCooldown { seconds, .. } => vec![*seconds],
            Self::RollIdleInterval { min, max } => vec![*min, *max],
            _ => Vec::new(),
        }
    }
}

fn spawn(body: &mut AgentBody, prefab: &str, count: u32, offset: Vec2) {
    let Some(own) = body.facts().position else {
        body.report_missing(Reference::Position);
        return;
    };
    let origin = own + offset;
    let rotation = match body.facts().target {
        Some(target) => {
            let aim = target.position - origin;
            aim.y.atan2(aim.x).to_degrees()
        }
        None => 0.0,
    };

    let agent = body.id();
    for _ in 0..count {
        let spawned = body.ports().spawner.spawn(agent, prefab, origin, rotation);
        match spawned {
            Some(entity) => body.emit(AgentEvent::Spawned {
                agent,
                prefab: prefab.to_owned(),
                entity,
            }),
            None => {
                body.report_missing(Reference::Spawn(prefab.to_owned()));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::facts::Facts;
    use crate::ports::{Ports, Recorder};
    use crate::types::AgentId;

    fn recorded_body() -> (AgentBody, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::new());
        let body = AgentBody::new(
            AgentId(1),
            AgentId::PLAYER,
            100,
            Ports::recorded(recorder.clone()),
            1,
        );
        (body, recorder)
    }

    #[test]
    fn leap_follows_target_side() {
        let (mut body, recorder) = recorded_body();
        body.observe(Facts::at(Vec2::ZERO).with_target(AgentId::PLAYER, Vec2::new(-4.0, 0.0)));

        Action::ImpulseTowardTarget {
            horizontal: 6.0,
            vertical: 12.0,
        }
        .apply(&mut body);

        assert_eq!(recorder.impulses(AgentId(1)), vec![Vec2::new(-6.0, 12.0)]);
    }

    #[test]
    fn damage_only_lands_within_range() {
        let (mut body, _) = recorded_body();
        body.observe(Facts::at(Vec2::ZERO).with_target(AgentId::PLAYER, Vec2::new(3.0, 0.0)));

        Action::DealDamage {
            amount: 10,
            range: 2.0,
        }
        .apply(&mut body);
        assert!(body.drain_events().is_empty());

        Action::DealDamage {
            amount: 10,
            range: 4.0,
        }
        .apply(&mut body);
        assert_eq!(
            body.drain_events(),
            vec![AgentEvent::DamageDealt {
                agent: AgentId(1),
                target: AgentId::PLAYER,
                amount: 10,
            }]
        );
    }

    #[test]
    fn spawn_reports_each_entity() {
        let (mut body, recorder) = recorded_body();
        body.observe(Facts::at(Vec2::ZERO));

        Action::spawn("skeleton", 3).apply(&mut body);

        assert_eq!(recorder.spawn_count(AgentId(1)), 3);
        assert_eq!(body.live_spawns(), 3);
        let spawned = body
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, AgentEvent::Spawned { .. }))
            .count();
        assert_eq!(spawned, 3);
    }

    #[test]
    fn farthest_waypoint_wins() {
        let (body, recorder) = recorded_body();
        let mut body = body.with_waypoints(vec![Vec2::new(-3.0, 0.0), Vec2::new(9.0, 0.0)]);
        body.observe(Facts::at(Vec2::new(1.0, 0.0)));

        Action::TeleportToFarthestWaypoint.apply(&mut body);

        assert_eq!(body.destination(), Some(Vec2::new(9.0, 0.0)));
        assert!(recorder.calls().contains(&crate::ports::PortCall::Teleport {
            agent: AgentId(1),
            position: Vec2::new(9.0, 0.0),
        }));
    }
}
