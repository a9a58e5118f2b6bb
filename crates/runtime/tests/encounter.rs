//! Boss encounters driven through a `World` without the async worker.

use game_core::{AgentEvent, AgentFlags, AgentId, BehaviorState, EngineConfig, Vec2};
use runtime::{Topic, World};

fn slime_king() -> game_core::Archetype {
    game_content::preset("slime_king")
        .expect("slime_king preset")
        .compile()
        .expect("slime_king compiles")
}

fn crossed(events: &[runtime::Event]) -> Vec<i32> {
    events
        .iter()
        .filter_map(|event| match event.payload {
            AgentEvent::ThresholdCrossed { value, .. } => Some(value),
            _ => None,
        })
        .collect()
}

#[test]
fn slime_king_transforms_after_a_cascading_hit() {
    let mut world = World::new(EngineConfig::default().with_tick_rate(4));
    world.place(AgentId::PLAYER, Vec2::new(10.0, 0.0));
    let boss = world.spawn(&slime_king(), Vec2::ZERO);
    world.tick();

    assert!(world.apply_damage(boss, 240).unwrap());
    assert_eq!(world.agent(boss).unwrap().state(), BehaviorState::Rampage);
    let report = world.tick();
    assert_eq!(crossed(&report.events), vec![400, 300]);

    assert!(world.apply_damage(boss, 170).unwrap());
    let agent = world.agent(boss).unwrap();
    assert_eq!(agent.health().current(), 90);
    assert_eq!(agent.phases().locked_into(), Some(1));
    assert!(agent.flags().contains(AgentFlags::UNTOUCHABLE));
    assert!(!world.apply_damage(boss, 50).unwrap());

    let mut events = Vec::new();
    for _ in 0..12 {
        events.extend(world.tick().events);
    }
    assert_eq!(crossed(&events), vec![250, 200, 100]);
    assert!(events.iter().any(|event| matches!(
        event.payload,
        AgentEvent::PhaseChanged { to: 1, .. }
    )));
    assert!(events.iter().any(|event| matches!(
        event.payload,
        AgentEvent::PhaseEnabled { index: 1, .. }
    )));

    let agent = world.agent(boss).unwrap();
    assert_eq!(agent.phases().active_index(), 1);
    assert!(!agent.flags().contains(AgentFlags::UNTOUCHABLE));
    assert_eq!(agent.health().current(), 90);
}

#[test]
fn killing_the_boss_ends_the_encounter() {
    let mut world = World::new(EngineConfig::default().with_tick_rate(4));
    world.place(AgentId::PLAYER, Vec2::new(10.0, 0.0));
    let boss = world.spawn(&slime_king(), Vec2::ZERO);
    let mut lifecycle = world.bus().subscribe(Topic::Lifecycle);
    world.tick();

    assert!(world.apply_damage(boss, 600).unwrap());
    let report = world.tick();
    assert_eq!(report.deaths, vec![boss]);
    assert_eq!(world.agent(boss).unwrap().state(), BehaviorState::Death);
    assert!(!world.apply_damage(boss, 10).unwrap());

    // Two second linger at four ticks per second.
    let mut despawned = Vec::new();
    for _ in 0..10 {
        despawned.extend(world.tick().despawned);
    }
    assert_eq!(despawned, vec![boss]);
    assert!(world.agent(boss).is_none());

    let died = lifecycle.try_recv().unwrap();
    assert_eq!(died.payload, AgentEvent::Died { agent: boss });
    let gone = lifecycle.try_recv().unwrap();
    assert_eq!(gone.payload, AgentEvent::Despawned { agent: boss });
}
