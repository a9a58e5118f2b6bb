use game_core::{
    Action, AgentFlags, ArchetypeSpec, BehaviorState, DeathSpec, Guard, Movement, PhaseSpec,
    Reaction, Repeat, SequenceSpec, StateSpec, StepSpec, TransitionTable, Vec2,
};

use super::{idle, in_melee_reach, melee, patrol};

fn route(half_width: f32) -> Vec<Vec2> {
    vec![Vec2::new(-half_width, 0.0), Vec2::new(half_width, 0.0)]
}

fn linger(seconds: f32) -> DeathSpec {
    DeathSpec {
        linger: seconds,
        ..DeathSpec::default()
    }
}

/// Contact-damage blob: patrols, chases, bites.
pub fn slime() -> ArchetypeSpec {
    const CONTACT: i32 = 25;
    let table = TransitionTable::new(BehaviorState::Patrol, BehaviorState::Patrol)
        .state(patrol(2.0, 5.0, (3.0, 6.0), BehaviorState::Chase).contact_damage(CONTACT))
        .state(idle(1.5, 5.0, BehaviorState::Chase).contact_damage(CONTACT))
        .state(
            StateSpec::new(BehaviorState::Chase)
                .requires_target()
                .movement(Movement::Chase { speed: 2.0 })
                .contact_damage(CONTACT)
                .to(Guard::TargetBeyond(8.0), BehaviorState::Patrol)
                .to(in_melee_reach(1.5), BehaviorState::Melee),
        )
        .state(melee("slime_attack", "Attack", CONTACT, 1.5, 1.0).contact_damage(CONTACT));

    ArchetypeSpec::new("slime", 100)
        .phase(PhaseSpec::new("main", table))
        .patrol(route(4.0), 0.25)
        .death(linger(1.0))
}

/// Keeps its distance and fires arrows.
pub fn bone_archer() -> ArchetypeSpec {
    let volley = SequenceSpec::new("arrow_shot")
        .then(
            StepSpec::seconds("draw", 0.5)
                .enter(Action::Stop)
                .enter(Action::FaceTarget)
                .enter(Action::trigger("Attack"))
                .enter(Action::cooldown("shot", 2.0)),
        )
        .then(
            StepSpec::instant("loose")
                .enter(Action::Spawn {
                    prefab: "arrow".into(),
                    count: 1,
                    offset: Vec2::new(0.6, 0.4),
                })
                .enter(Action::PlaySound("ArrowShot".into())),
        )
        .then(StepSpec::seconds("reload", 1.5));

    let table = TransitionTable::new(BehaviorState::Patrol, BehaviorState::Patrol)
        .state(patrol(2.0, 12.0, (2.0, 5.0), BehaviorState::Chase))
        .state(idle(1.0, 12.0, BehaviorState::Chase))
        .state(
            StateSpec::new(BehaviorState::Chase)
                .requires_target()
                .movement(Movement::Chase { speed: 4.0 })
                .to(Guard::TargetBeyond(12.0), BehaviorState::Patrol)
                .to(
                    Guard::within(10.0).and(Guard::cooldown("shot")),
                    BehaviorState::RangedAttack,
                ),
        )
        .state(StateSpec::new(BehaviorState::RangedAttack).sequence(volley, BehaviorState::Chase));

    ArchetypeSpec::new("bone_archer", 50)
        .phase(PhaseSpec::new("main", table))
        .patrol(route(6.0), 0.25)
        .death(linger(1.0))
}

/// Duelist that raises its guard once badly hurt, then heals to full.
pub fn bone_gladiator() -> ArchetypeSpec {
    let guard = SequenceSpec::new("block")
        .then(StepSpec::seconds("guard", 10.0))
        .then(
            StepSpec::instant("recover")
                .enter(Action::HealToFull)
                .enter(Action::ClearFlags(AgentFlags::BLOCKING))
                .enter(Action::trigger("Idle")),
        );

    let table = TransitionTable::new(BehaviorState::Patrol, BehaviorState::Patrol)
        .state(patrol(2.0, 5.0, (3.0, 6.0), BehaviorState::Chase))
        .state(idle(1.5, 5.0, BehaviorState::Chase))
        .state(
            StateSpec::new(BehaviorState::Chase)
                .requires_target()
                .movement(Movement::Chase { speed: 4.0 })
                .to(
                    Guard::TargetLostFor {
                        range: 5.0,
                        seconds: 3.0,
                    },
                    BehaviorState::Patrol,
                )
                .to(in_melee_reach(2.0), BehaviorState::Melee),
        )
        .state(melee("gladius", "Attack", 20, 2.0, 1.0))
        .state(
            StateSpec::new(BehaviorState::Block)
                .on_enter(Action::Stop)
                .on_enter(Action::trigger("Block"))
                .on_enter(Action::SetFlags(AgentFlags::BLOCKING))
                .sequence(guard, BehaviorState::Chase),
        );

    ArchetypeSpec::new("bone_gladiator", 100)
        .phase(PhaseSpec::new("main", table))
        .threshold(25, Reaction::Special(BehaviorState::Block))
        .patrol(route(5.0), 0.25)
        .death(linger(1.0))
}

/// Notices the target, then charges it with an untouchable dash.
pub fn dashing_golem() -> ArchetypeSpec {
    let detect = SequenceSpec::new("detect").then(
        StepSpec::seconds("alert", 0.5)
            .enter(Action::Stop)
            .enter(Action::FaceTarget)
            .enter(Action::trigger("Detect")),
    );
    let dash = SequenceSpec::new("dash")
        .then(
            StepSpec::seconds("charge", 0.5)
                .enter(Action::Stop)
                .enter(Action::FaceTarget)
                .enter(Action::cooldown("dash", 2.0)),
        )
        .then(
            StepSpec::seconds("dash", 0.6)
                .enter(Action::SetFlags(AgentFlags::UNTOUCHABLE))
                .enter(Action::trigger("Attack"))
                .enter(Action::PlaySound("GolemPunch".into()))
                .enter(Action::ImpulseTowardTarget {
                    horizontal: 12.0,
                    vertical: 0.0,
                })
                .exit(Action::DealDamage {
                    amount: 25,
                    range: 2.0,
                }),
        )
        .then(
            StepSpec::seconds("brake", 0.2)
                .enter(Action::Stop)
                .exit(Action::ClearFlags(AgentFlags::UNTOUCHABLE)),
        );

    let table = TransitionTable::new(BehaviorState::Patrol, BehaviorState::Patrol)
        .state(patrol(2.0, 7.0, (3.0, 6.0), BehaviorState::Detect))
        .state(idle(1.5, 7.0, BehaviorState::Detect))
        .state(StateSpec::new(BehaviorState::Detect).sequence(detect, BehaviorState::Chase))
        .state(
            StateSpec::new(BehaviorState::Chase)
                .requires_target()
                .movement(Movement::Chase { speed: 4.0 })
                .to(
                    Guard::TargetLostFor {
                        range: 10.0,
                        seconds: 5.0,
                    },
                    BehaviorState::Patrol,
                )
                .to(
                    Guard::within(3.0).and(Guard::cooldown("dash")),
                    BehaviorState::Dash,
                ),
        )
        .state(StateSpec::new(BehaviorState::Dash).sequence(dash, BehaviorState::Chase));

    ArchetypeSpec::new("dashing_golem", 150)
        .phase(PhaseSpec::new("main", table))
        .patrol(route(5.0), 0.25)
        .death(linger(1.0))
}

/// Chases into range, counts down, then blows itself up. Killing it first
/// only delays the blast.
pub fn exploding_slime() -> ArchetypeSpec {
    const BLAST: Action = Action::DealDamage {
        amount: 50,
        range: 4.0,
    };
    let countdown = SequenceSpec::new("countdown")
        .then(
            StepSpec::seconds("fuse", 3.0)
                .enter(Action::trigger("Attack"))
                .enter(Action::PlaySound("SlimeExplode".into())),
        )
        .then(
            StepSpec::instant("detonate")
                .enter(BLAST)
                .enter(Action::trigger("Death"))
                .enter(Action::SelfDestruct),
        );
    let dying = SequenceSpec::new("dying_blast")
        .then(StepSpec::seconds("fuse", 2.0).enter(Action::trigger("Death2")))
        .then(
            StepSpec::instant("explode")
                .enter(BLAST)
                .enter(Action::trigger("Death")),
        );

    let table = TransitionTable::new(BehaviorState::Patrol, BehaviorState::Patrol)
        .state(patrol(2.0, 6.0, (3.0, 6.0), BehaviorState::Chase))
        .state(idle(1.5, 6.0, BehaviorState::Chase))
        .state(
            StateSpec::new(BehaviorState::Chase)
                .requires_target()
                .movement(Movement::Chase { speed: 5.0 })
                .to(Guard::within(1.5), BehaviorState::SpecialAttack),
        )
        .state(
            StateSpec::new(BehaviorState::SpecialAttack)
                .movement(Movement::Chase { speed: 5.0 })
                .sequence_without_resume(countdown),
        );

    ArchetypeSpec::new("exploding_slime", 100)
        .phase(PhaseSpec::new("main", table))
        .patrol(route(4.0), 0.25)
        .death(DeathSpec {
            enter: vec![Action::Stop],
            sequence: Some(dying),
            linger: 2.5,
        })
}

/// Patrols a loop in the air and dives at the target on sight.
pub fn flying_slime() -> ArchetypeSpec {
    const CONTACT: i32 = 15;
    let table = TransitionTable::new(BehaviorState::Patrol, BehaviorState::Patrol)
        .state(
            patrol(2.0, 5.0, (3.0, 6.0), BehaviorState::Chase)
                .movement(Movement::FlyPatrol { speed: 2.0 })
                .contact_damage(CONTACT),
        )
        .state(idle(1.5, 5.0, BehaviorState::Chase).contact_damage(CONTACT))
        .state(
            StateSpec::new(BehaviorState::Chase)
                .requires_target()
                .movement(Movement::FlyChase { speed: 4.0 })
                .contact_damage(CONTACT)
                .to(Guard::TargetBeyond(10.0), BehaviorState::Patrol),
        );

    let square = vec![
        Vec2::new(-3.0, 0.0),
        Vec2::new(-3.0, 3.0),
        Vec2::new(3.0, 3.0),
        Vec2::new(3.0, 0.0),
    ];
    ArchetypeSpec::new("flying_slime", 50)
        .phase(PhaseSpec::new("main", table))
        .patrol(square, 0.25)
        .death(linger(1.0))
}

/// Raises its armor when it notices the target; blocks while armoring up.
pub fn armored_golem() -> ArchetypeSpec {
    const SMASH: i32 = 20;
    let armor_up = SequenceSpec::new("armor_up").then(
        StepSpec::seconds("armor_up", 0.5)
            .enter(Action::Stop)
            .enter(Action::trigger("ArmorUp"))
            .enter(Action::SetFlags(AgentFlags::BLOCKING))
            .exit(Action::ClearFlags(AgentFlags::BLOCKING)),
    );
    let smash = SequenceSpec::new("smash")
        .then(
            StepSpec::seconds("windup", 1.0)
                .enter(Action::Stop)
                .enter(Action::FaceTarget)
                .enter(Action::trigger("Attack"))
                .enter(Action::cooldown(super::MELEE_COOLDOWN, 1.0)),
        )
        .then(StepSpec::instant("strike").enter(Action::DealDamage {
            amount: SMASH,
            range: 2.0,
        }));

    let table = TransitionTable::new(BehaviorState::Patrol, BehaviorState::Patrol)
        .state(patrol(2.0, 7.0, (3.0, 6.0), BehaviorState::Block))
        .state(idle(1.5, 7.0, BehaviorState::Block))
        .state(StateSpec::new(BehaviorState::Block).sequence(armor_up, BehaviorState::Chase))
        .state(
            StateSpec::new(BehaviorState::Chase)
                .requires_target()
                .movement(Movement::Chase { speed: 4.0 })
                .to(Guard::TargetBeyond(10.0), BehaviorState::Patrol)
                .to(in_melee_reach(2.0), BehaviorState::Melee),
        )
        .state(
            StateSpec::new(BehaviorState::Melee)
                .contact_damage(SMASH)
                .sequence(smash, BehaviorState::Chase),
        );

    ArchetypeSpec::new("armored_golem", 150)
        .phase(PhaseSpec::new("main", table))
        .patrol(route(5.0), 0.25)
        .death(linger(2.0))
}

/// Stationary summoner: plays skulls into the arena while the target is near.
pub fn bone_pianist() -> ArchetypeSpec {
    let recital = SequenceSpec::new("summon_skulls")
        .then(
            StepSpec::seconds("verse", 5.0)
                .enter(Action::Spawn {
                    prefab: "skull".into(),
                    count: 1,
                    offset: Vec2::new(0.0, 1.5),
                })
                .enter(Action::trigger("Attack")),
        )
        .repeat(Repeat::Forever);

    let table = TransitionTable::new(BehaviorState::Idle, BehaviorState::Idle)
        .state(
            StateSpec::new(BehaviorState::Idle)
                .on_enter(Action::Stop)
                .on_enter(Action::trigger("Idle"))
                .to(Guard::within(10.0), BehaviorState::SummonPhase),
        )
        .state(
            StateSpec::new(BehaviorState::SummonPhase)
                .requires_target()
                .sequence_without_resume(recital)
                .to(Guard::TargetBeyond(10.0), BehaviorState::Idle),
        );

    ArchetypeSpec::new("bone_pianist", 100)
        .phase(PhaseSpec::new("main", table))
        .death(DeathSpec {
            enter: vec![
                Action::Stop,
                Action::trigger("Death"),
                Action::StopSound("BGM".into()),
            ],
            sequence: None,
            linger: 1.0,
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use game_core::{Agent, AgentEvent, AgentId, Facts, Ports, Recorder, SpawnOptions};

    use super::*;

    const DT: f32 = 0.1;

    fn spawn(spec: ArchetypeSpec) -> (Agent, Arc<Recorder>) {
        let archetype = spec.compile().unwrap();
        let recorder = Arc::new(Recorder::new());
        let agent = Agent::spawn(
            &archetype,
            AgentId(1),
            Ports::recorded(recorder.clone()),
            SpawnOptions::default(),
        );
        (agent, recorder)
    }

    fn facing(distance: f32) -> Facts {
        Facts::at(Vec2::ZERO).with_target(AgentId::PLAYER, Vec2::new(distance, 0.0))
    }

    #[test]
    fn gladiator_blocks_then_heals_once() {
        let (mut agent, _) = spawn(bone_gladiator());
        agent.tick(facing(3.0), DT);
        assert_eq!(agent.state(), BehaviorState::Chase);

        agent.apply_damage(80);
        assert_eq!(agent.state(), BehaviorState::Block);
        assert!(!agent.apply_damage(50));

        for _ in 0..101 {
            agent.tick(facing(3.0), DT);
        }
        assert_eq!(agent.health().current(), 100);
        assert!(!agent.flags().contains(AgentFlags::BLOCKING));
        assert_ne!(agent.state(), BehaviorState::Block);

        agent.apply_damage(80);
        assert_ne!(agent.state(), BehaviorState::Block);
    }

    #[test]
    fn golem_detects_before_chasing() {
        let (mut agent, recorder) = spawn(dashing_golem());
        agent.tick(facing(6.0), DT);
        assert_eq!(agent.state(), BehaviorState::Detect);
        assert!(recorder.triggers(AgentId(1)).contains(&"Detect".to_owned()));

        for _ in 0..6 {
            agent.tick(facing(6.0), DT);
        }
        assert_eq!(agent.state(), BehaviorState::Chase);
    }

    #[test]
    fn archer_shoots_from_range() {
        let (mut agent, recorder) = spawn(bone_archer());
        agent.tick(facing(9.0), DT);
        assert_eq!(agent.state(), BehaviorState::Chase);
        agent.tick(facing(9.0), DT);
        assert_eq!(agent.state(), BehaviorState::RangedAttack);

        for _ in 0..6 {
            agent.tick(facing(9.0), DT);
        }
        assert_eq!(recorder.spawn_count(AgentId(1)), 1);
    }

    fn tick_collecting(agent: &mut Agent, facts: Facts, ticks: usize) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            agent.tick(facts, DT);
            events.extend(agent.drain_events());
        }
        events
    }

    fn blasts(events: &[AgentEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, AgentEvent::DamageDealt { amount: 50, .. }))
            .count()
    }

    #[test]
    fn exploding_slime_detonates_once_after_countdown() {
        let (mut agent, recorder) = spawn(exploding_slime());
        let events = tick_collecting(&mut agent, facing(1.0), 40);

        assert!(agent.is_dead());
        assert_eq!(blasts(&events), 1);
        let deaths = events
            .iter()
            .filter(|event| matches!(event, AgentEvent::Died { .. }))
            .count();
        assert_eq!(deaths, 1);

        let triggers = recorder.triggers(AgentId(1));
        assert!(triggers.contains(&"Attack".to_owned()));
        assert_eq!(triggers.iter().filter(|name| *name == "Death").count(), 1);
        assert!(!triggers.contains(&"Death2".to_owned()));
    }

    #[test]
    fn exploding_slime_killed_early_still_blows_up() {
        let (mut agent, recorder) = spawn(exploding_slime());
        agent.tick(facing(20.0), DT);
        assert_eq!(agent.state(), BehaviorState::Patrol);

        assert!(agent.apply_damage(100));
        assert!(agent.is_dead());
        let early = tick_collecting(&mut agent, facing(2.0), 10);
        assert_eq!(blasts(&early), 0);
        assert!(recorder.triggers(AgentId(1)).contains(&"Death2".to_owned()));

        let late = tick_collecting(&mut agent, facing(2.0), 13);
        assert_eq!(blasts(&late), 1);
        assert!(!agent.is_despawned());
    }

    #[test]
    fn armored_golem_blocks_only_while_armoring_up() {
        let (mut agent, recorder) = spawn(armored_golem());
        agent.tick(facing(5.0), DT);
        assert_eq!(agent.state(), BehaviorState::Block);
        assert!(agent.flags().contains(AgentFlags::BLOCKING));
        assert!(recorder.triggers(AgentId(1)).contains(&"ArmorUp".to_owned()));
        assert!(!agent.apply_damage(30));

        for _ in 0..8 {
            agent.tick(facing(5.0), DT);
        }
        assert_eq!(agent.state(), BehaviorState::Chase);
        assert!(!agent.flags().contains(AgentFlags::BLOCKING));
        assert!(agent.apply_damage(30));
        assert_eq!(agent.health().current(), 120);
    }

    #[test]
    fn flying_slime_dives_and_burns_on_contact() {
        let (mut agent, recorder) = spawn(flying_slime());
        let above = Facts::at(Vec2::ZERO).with_target(AgentId::PLAYER, Vec2::new(1.5, 2.0));
        agent.tick(above, DT);
        agent.tick(above, DT);
        assert_eq!(agent.state(), BehaviorState::Chase);

        let velocity = recorder.last_velocity(AgentId(1)).unwrap();
        assert!(velocity.y > 0.0);
        assert_eq!(agent.contact(AgentId::PLAYER), Some(15));
    }

    #[test]
    fn pianist_summons_while_the_target_stays_near() {
        let (mut agent, recorder) = spawn(bone_pianist());
        agent.tick(facing(8.0), DT);
        assert_eq!(agent.state(), BehaviorState::SummonPhase);

        for _ in 0..55 {
            agent.tick(facing(8.0), DT);
        }
        assert_eq!(recorder.spawn_count(AgentId(1)), 2);

        agent.tick(facing(15.0), DT);
        assert_eq!(agent.state(), BehaviorState::Idle);
        recorder.clear_spawns(AgentId(1));
        for _ in 0..60 {
            agent.tick(facing(15.0), DT);
        }
        assert_eq!(recorder.spawn_count(AgentId(1)), 0);
    }
}
