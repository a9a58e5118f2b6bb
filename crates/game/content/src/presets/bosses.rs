use game_core::{
    Action, AgentFlags, ArchetypeSpec, BehaviorState, DeathSpec, Guard, Movement, PhaseSpec,
    Reaction, Repeat, SequenceSpec, StateSpec, StepSpec, TransitionTable, Vec2, WaitSpec,
};

use super::{in_melee_reach, melee};

/// Arena bosses wake up as soon as the target is in the room.
const ARENA_RANGE: f32 = 15.0;

fn arena_table(chase_speed: f32, melee_state: StateSpec, reach: f32) -> TransitionTable {
    TransitionTable::new(BehaviorState::Chase, BehaviorState::Idle)
        .state(
            StateSpec::new(BehaviorState::Idle)
                .on_enter(Action::trigger("Idle"))
                .to(Guard::within(ARENA_RANGE), BehaviorState::Chase),
        )
        .state(
            StateSpec::new(BehaviorState::Chase)
                .requires_target()
                .movement(Movement::Chase { speed: chase_speed })
                .to(in_melee_reach(reach), BehaviorState::Melee),
        )
        .state(melee_state)
}

fn rage() -> StepSpec {
    StepSpec::seconds("rage", 1.0)
        .enter(Action::Stop)
        .enter(Action::trigger("Rage"))
}

/// Two-phase slime boss: bouncing rampages, then slamming ones after a
/// three second untouchable transformation.
pub fn slime_king() -> ArchetypeSpec {
    const CONTACT: i32 = 25;

    let bouncing = SequenceSpec::new("rampage")
        .intro(rage())
        .then(
            StepSpec::seconds("jump", 0.5)
                .enter(Action::trigger("Jump"))
                .enter(Action::ImpulseTowardTarget {
                    horizontal: 10.0,
                    vertical: 7.0,
                }),
        )
        .then(StepSpec::seconds("airborne", 1.0))
        .then(StepSpec::new(
            "land",
            WaitSpec::UntilGrounded { timeout: Some(2.0) },
        ))
        .repeat(Repeat::Times(3));

    let slamming = SequenceSpec::new("slam_rampage")
        .intro(rage())
        .then(StepSpec::seconds("jump", 0.5).enter(Action::trigger("Jump")))
        .then(
            StepSpec::new(
                "leap",
                WaitSpec::UntilNearTarget {
                    tolerance: 0.5,
                    timeout: Some(1.0),
                },
            )
            .enter(Action::ImpulseTowardTarget {
                horizontal: 10.0,
                vertical: 7.0,
            }),
        )
        .then(StepSpec::seconds("hover", 1.0).enter(Action::SetVelocity(Vec2::ZERO)))
        .then(
            StepSpec::seconds("slam", 0.5)
                .enter(Action::trigger("Slam"))
                .enter(Action::Impulse(Vec2::DOWN * 15.0)),
        )
        .then(StepSpec::seconds("land", 0.5).enter(Action::trigger("AttackB")))
        .repeat(Repeat::Times(3));

    let transformation = SequenceSpec::new("phase_two_intro").then(
        StepSpec::seconds("transform", 3.0)
            .enter(Action::Stop)
            .enter(Action::SetFlags(AgentFlags::UNTOUCHABLE))
            .enter(Action::trigger("Phase2Start"))
            .exit(Action::ClearFlags(AgentFlags::UNTOUCHABLE)),
    );

    let phase_one = arena_table(3.0, melee("attack_a", "AttackA", 20, 2.5, 1.5), 2.5).state(
        StateSpec::new(BehaviorState::Rampage)
            .contact_damage(CONTACT)
            .sequence(bouncing, BehaviorState::Chase),
    );
    let phase_two = arena_table(3.0, melee("attack_a", "AttackA", 20, 2.5, 1.5), 2.5).state(
        StateSpec::new(BehaviorState::Rampage)
            .contact_damage(CONTACT)
            .sequence(slamming, BehaviorState::Chase),
    );

    ArchetypeSpec::new("slime_king", 500)
        .phase(
            PhaseSpec::new("phase_one", phase_one)
                .special(400, BehaviorState::Rampage)
                .special(300, BehaviorState::Rampage),
        )
        .phase(
            PhaseSpec::new("phase_two", phase_two)
                .special(200, BehaviorState::Rampage)
                .special(100, BehaviorState::Rampage)
                .intro(transformation),
        )
        .threshold(250, Reaction::AdvancePhase(1))
        .death(DeathSpec {
            linger: 2.0,
            ..DeathSpec::default()
        })
}

/// Golem that retreats to the far waypoint and fires until it is hit.
pub fn golem_boss() -> ArchetypeSpec {
    let bullet_hell = SequenceSpec::new("bullet_hell")
        .intro(
            StepSpec::seconds("slam", 0.5)
                .enter(Action::Stop)
                .enter(Action::trigger("SlamGround")),
        )
        .intro(
            StepSpec::new(
                "retreat",
                WaitSpec::UntilArrived {
                    tolerance: 0.3,
                    timeout: Some(6.0),
                },
            )
            .enter(Action::SetFlags(AgentFlags::UNTOUCHABLE))
            .enter(Action::SetBool {
                name: "isMoving".into(),
                value: true,
            })
            .enter(Action::RunToFarthestWaypoint { speed: 4.0 })
            .exit(Action::Stop)
            .exit(Action::ClearFlags(AgentFlags::UNTOUCHABLE))
            .exit(Action::SetBool {
                name: "isMoving".into(),
                value: false,
            })
            .exit(Action::FaceTarget),
        )
        .then(
            StepSpec::seconds("reload", 1.5)
                .exit(Action::trigger("FireBullet"))
                .exit(Action::Spawn {
                    prefab: "golem_bullet".into(),
                    count: 1,
                    offset: Vec2::new(1.0, 0.5),
                }),
        )
        .repeat(Repeat::Forever);

    let table = arena_table(3.0, melee("golem_melee", "Melee", 30, 2.0, 1.0), 2.0).state(
        StateSpec::new(BehaviorState::BulletHell)
            .sequence_without_resume(bullet_hell)
            .interrupt_on_hit(BehaviorState::Chase),
    );

    ArchetypeSpec::new("golem_boss", 500)
        .phase(
            PhaseSpec::new("main", table)
                .special(400, BehaviorState::BulletHell)
                .special(300, BehaviorState::BulletHell),
        )
        .waypoints(vec![Vec2::new(-8.0, 0.0), Vec2::new(8.0, 0.0)])
        .death(DeathSpec {
            linger: 1.0,
            ..DeathSpec::default()
        })
}

/// Summoner: vanishes, reappears at the far waypoint and raises an army
/// until it is cleared; turns faster for the final stretch.
pub fn reaper() -> ArchetypeSpec {
    let hidden = AgentFlags::UNTOUCHABLE | AgentFlags::HIDDEN;
    let summon = SequenceSpec::new("summon_army")
        .then(
            StepSpec::seconds("vanish", 1.0)
                .enter(Action::Stop)
                .enter(Action::SetFlags(hidden))
                .enter(Action::trigger("Vanish")),
        )
        .then(
            StepSpec::seconds("appear", 1.0)
                .enter(Action::TeleportToFarthestWaypoint)
                .enter(Action::trigger("Appear"))
                .exit(Action::ClearFlags(AgentFlags::HIDDEN)),
        )
        .then(
            StepSpec::seconds("summon", 1.0)
                .enter(Action::SetBool {
                    name: "Summoning".into(),
                    value: true,
                })
                .enter(Action::SetFlags(AgentFlags::SUMMONING))
                .enter(Action::spawn("skeleton", 4)),
        )
        .then(StepSpec::new(
            "hold",
            WaitSpec::UntilSpawnsCleared {
                timeout: Some(30.0),
            },
        ))
        .then(
            StepSpec::seconds("reappear", 0.5)
                .enter(Action::SetBool {
                    name: "Summoning".into(),
                    value: false,
                })
                .enter(Action::ClearFlags(AgentFlags::SUMMONING))
                .exit(Action::ClearFlags(AgentFlags::UNTOUCHABLE)),
        );

    let summon_state = || {
        StateSpec::new(BehaviorState::SummonPhase).sequence(summon.clone(), BehaviorState::Chase)
    };
    let reaping = arena_table(5.0, melee("scythe", "Attack", 25, 2.0, 1.0), 2.0).state(summon_state());
    let final_stretch =
        arena_table(6.0, melee("scythe", "Attack", 30, 2.0, 0.6), 2.0).state(summon_state());

    let unleash = SequenceSpec::new("final_phase_intro").then(
        StepSpec::seconds("unleash", 1.5)
            .enter(Action::Stop)
            .enter(Action::SetFlags(AgentFlags::UNTOUCHABLE))
            .enter(Action::trigger("FinalPhase"))
            .exit(Action::ClearFlags(AgentFlags::UNTOUCHABLE)),
    );

    let mut spec = ArchetypeSpec::new("reaper", 500)
        .phase(PhaseSpec::new("reaping", reaping))
        .phase(PhaseSpec::new("final", final_stretch).intro(unleash))
        .waypoints(vec![Vec2::new(-7.0, 0.0), Vec2::new(7.0, 0.0)]);
    for at in [450, 350, 250, 150] {
        spec = spec.threshold(at, Reaction::Special(BehaviorState::SummonPhase));
    }
    spec.threshold(123, Reaction::AdvancePhase(1))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use game_core::{Agent, AgentEvent, AgentId, Facts, Ports, Recorder, SpawnOptions};

    use super::*;

    const BOSS: AgentId = AgentId(9);
    const DT: f32 = 0.25;

    fn spawn(spec: ArchetypeSpec) -> (Agent, Arc<Recorder>) {
        let archetype = spec.compile().unwrap();
        let recorder = Arc::new(Recorder::new());
        let agent = Agent::spawn(
            &archetype,
            BOSS,
            Ports::recorded(recorder.clone()),
            SpawnOptions::default(),
        );
        (agent, recorder)
    }

    fn facing(distance: f32) -> Facts {
        Facts::at(Vec2::ZERO).with_target(AgentId::PLAYER, Vec2::new(distance, 0.0))
    }

    #[test]
    fn slime_king_cascades_through_both_phases() {
        let (mut agent, recorder) = spawn(slime_king());
        agent.tick(facing(10.0), DT);

        assert_eq!(agent.report(260), vec![400, 300]);
        assert_eq!(agent.state(), BehaviorState::Rampage);

        assert_eq!(agent.report(90), vec![250, 200, 100]);
        assert_eq!(agent.phases().locked_into(), Some(1));
        assert!(recorder.triggers(BOSS).contains(&"Phase2Start".to_owned()));

        for _ in 0..12 {
            agent.tick(facing(10.0), DT);
        }
        assert_eq!(agent.phases().active_index(), 1);
        assert_eq!(agent.state(), BehaviorState::Rampage);
        assert_eq!(agent.active_sequence(), Some("slam_rampage"));
    }

    #[test]
    fn golem_bullet_hell_ends_when_hit() {
        let (mut agent, recorder) = spawn(golem_boss());
        agent.tick(facing(10.0), DT);
        agent.report(390);
        assert_eq!(agent.state(), BehaviorState::BulletHell);
        assert!(agent.flags().is_empty());

        // Slam, then the retreat makes it untouchable.
        agent.tick(facing(10.0), DT);
        agent.tick(facing(10.0), DT);
        assert!(agent.flags().contains(AgentFlags::UNTOUCHABLE));
        assert!(!agent.apply_damage(10));
        assert_eq!(agent.state(), BehaviorState::BulletHell);

        // No spatial host moves it, so the retreat times out.
        for _ in 0..24 {
            agent.tick(facing(10.0), DT);
        }
        assert!(!agent.flags().contains(AgentFlags::UNTOUCHABLE));
        for _ in 0..12 {
            agent.tick(facing(10.0), DT);
        }
        assert!(recorder.spawn_count(BOSS) >= 1);

        assert!(agent.apply_damage(10));
        assert_eq!(agent.state(), BehaviorState::Chase);
    }

    #[test]
    fn reaper_summons_at_each_threshold() {
        let (mut agent, recorder) = spawn(reaper());
        agent.tick(facing(10.0), DT);

        agent.report(440);
        assert_eq!(agent.state(), BehaviorState::SummonPhase);
        assert!(agent.flags().contains(AgentFlags::HIDDEN));

        for _ in 0..12 {
            agent.tick(facing(10.0), DT);
        }
        assert_eq!(recorder.spawn_count(BOSS), 4);
        assert!(agent.flags().contains(AgentFlags::SUMMONING));

        recorder.clear_spawns(BOSS);
        for _ in 0..3 {
            agent.tick(facing(10.0), DT);
        }
        assert_eq!(agent.state(), BehaviorState::Chase);
        assert!(agent.flags().is_empty());

        let events = agent.drain_events();
        assert!(events.contains(&AgentEvent::ThresholdCrossed {
            agent: BOSS,
            value: 450
        }));
    }
}
