//! Built-in archetypes.
//!
//! Minions share the patrol → idle → chase → attack cycle built from the
//! helpers below; bosses add health-threshold specials and phases.

mod bosses;
mod minions;

pub use bosses::{golem_boss, reaper, slime_king};
pub use minions::{
    armored_golem, bone_archer, bone_gladiator, bone_pianist, dashing_golem, exploding_slime,
    flying_slime, slime,
};

use game_core::{
    Action, ArchetypeSpec, BehaviorState, Guard, Movement, SequenceSpec, StateSpec, StepSpec,
};

pub const PRESET_NAMES: [&str; 11] = [
    "slime",
    "exploding_slime",
    "flying_slime",
    "bone_archer",
    "bone_gladiator",
    "bone_pianist",
    "dashing_golem",
    "armored_golem",
    "slime_king",
    "golem_boss",
    "reaper",
];

/// Looks up a built-in archetype by name.
pub fn preset(name: &str) -> Option<ArchetypeSpec> {
    let spec = match name {
        "slime" => slime(),
        "exploding_slime" => exploding_slime(),
        "flying_slime" => flying_slime(),
        "bone_archer" => bone_archer(),
        "bone_gladiator" => bone_gladiator(),
        "bone_pianist" => bone_pianist(),
        "dashing_golem" => dashing_golem(),
        "armored_golem" => armored_golem(),
        "slime_king" => slime_king(),
        "golem_boss" => golem_boss(),
        "reaper" => reaper(),
        _ => return None,
    };
    Some(spec)
}

pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESET_NAMES.into_iter()
}

/// Cooldown shared by every melee swing.
pub(crate) const MELEE_COOLDOWN: &str = "melee";
const WINDUP: f32 = 0.3;

/// Walks the patrol route, idling whenever the rolled interval runs out.
pub(crate) fn patrol(
    speed: f32,
    detect_range: f32,
    idle_interval: (f32, f32),
    detected: BehaviorState,
) -> StateSpec {
    StateSpec::new(BehaviorState::Patrol)
        .on_enter(Action::RollIdleInterval {
            min: idle_interval.0,
            max: idle_interval.1,
        })
        .movement(Movement::Patrol { speed })
        .to(Guard::within(detect_range), detected)
        .to(Guard::IdleIntervalElapsed, BehaviorState::Idle)
}

pub(crate) fn idle(duration: f32, detect_range: f32, detected: BehaviorState) -> StateSpec {
    StateSpec::new(BehaviorState::Idle)
        .on_enter(Action::trigger("Idle"))
        .to(Guard::within(detect_range), detected)
        .to(Guard::StateTimerElapsed(duration), BehaviorState::Patrol)
}

/// Swing, hit whatever is in `range`, then recover until the cooldown ends.
pub(crate) fn melee(
    name: &str,
    trigger: &str,
    damage: i32,
    range: f32,
    cooldown: f32,
) -> StateSpec {
    let swing = SequenceSpec::new(name)
        .then(
            StepSpec::seconds("windup", WINDUP)
                .enter(Action::Stop)
                .enter(Action::FaceTarget)
                .enter(Action::trigger(trigger))
                .enter(Action::cooldown(MELEE_COOLDOWN, cooldown)),
        )
        .then(StepSpec::instant("strike").enter(Action::DealDamage {
            amount: damage,
            range,
        }))
        .then(StepSpec::seconds("recover", (cooldown - WINDUP).max(0.0)));

    StateSpec::new(BehaviorState::Melee).sequence(swing, BehaviorState::Chase)
}

/// Chase guard that starts a melee swing.
pub(crate) fn in_melee_reach(range: f32) -> Guard {
    Guard::within(range).and(Guard::cooldown(MELEE_COOLDOWN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_compiles() {
        for name in preset_names() {
            let spec = preset(name).unwrap_or_else(|| panic!("missing preset {name}"));
            assert_eq!(spec.name, name);
            if let Err(error) = spec.compile() {
                panic!("preset {name} failed to compile: {error}");
            }
        }
        assert!(preset("dragon").is_none());
    }

    #[test]
    fn melee_recovers_for_the_rest_of_the_cooldown() {
        let state = melee("swing", "Attack", 10, 2.0, 1.0);
        let sequence = state.sequence.unwrap();
        assert_eq!(sequence.body.len(), 3);
        match sequence.body[2].wait {
            game_core::WaitSpec::Seconds(seconds) => assert!((seconds - 0.7).abs() < 1e-6),
            ref other => panic!("unexpected wait {other:?}"),
        }
        assert_eq!(state.resume, Some(BehaviorState::Chase));
    }
}
