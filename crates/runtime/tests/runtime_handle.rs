use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use game_content::ContentFactory;
use game_core::{AgentEvent, AgentId, BehaviorState, EngineConfig, Vec2};
use runtime::{Runtime, RuntimeError, Strike, Topic};

#[tokio::test]
async fn slime_attacks_the_player_and_dies() {
    let deaths = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&deaths);
    let runtime = Runtime::builder()
        .observe_deaths(Arc::new(move |_: AgentId, _: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .await
        .expect("runtime should start");
    let handle = runtime.handle();
    let mut lifecycle = handle.subscribe(Topic::Lifecycle);

    handle.place(AgentId::PLAYER, Vec2::new(1.0, 0.0)).await.unwrap();
    let slime = handle.spawn("slime", Vec2::ZERO).await.unwrap();

    let reports = handle.step(60).await.unwrap();
    assert_eq!(reports.len(), 60);
    let strikes: Vec<Strike> = reports.into_iter().flat_map(|report| report.outgoing).collect();
    assert!(strikes.contains(&Strike {
        source: slime,
        target: AgentId::PLAYER,
        amount: 25,
    }));

    assert!(handle.apply_damage(slime, 100).await.unwrap());
    let report = handle.step(1).await.unwrap().remove(0);
    assert_eq!(report.deaths, vec![slime]);

    let died = lifecycle.recv().await.unwrap();
    assert_eq!(died.payload, AgentEvent::Died { agent: slime });
    assert_eq!(deaths.load(Ordering::SeqCst), 1);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.agent(slime).unwrap().state, BehaviorState::Death);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_names_and_ids_are_rejected() {
    let runtime = Runtime::builder().build().await.unwrap();
    let handle = runtime.handle();

    let err = handle.spawn("dragon", Vec2::ZERO).await.unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownArchetype(name) if name == "dragon"));

    let err = handle.apply_damage(AgentId(42), 10).await.unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownAgent(AgentId(42))));

    runtime.shutdown().await.unwrap();
    assert!(matches!(
        handle.snapshot().await,
        Err(RuntimeError::CommandChannelClosed)
    ));
}

#[tokio::test]
async fn zero_tick_rate_is_refused() {
    let result = Runtime::builder()
        .engine(EngineConfig::default().with_tick_rate(0))
        .build()
        .await;
    assert!(matches!(result, Err(RuntimeError::InvalidTickRate)));
}

#[tokio::test]
async fn free_running_world_advances_on_its_own() {
    let runtime = Runtime::builder()
        .engine(EngineConfig::default().with_tick_rate(100))
        .free_running(true)
        .build()
        .await
        .unwrap();
    let handle = runtime.handle();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.tick > 0);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn archetypes_load_from_a_data_directory() {
    let dir = tempfile::tempdir().unwrap();
    let archetypes = dir.path().join("archetypes");
    std::fs::create_dir(&archetypes).unwrap();
    std::fs::write(
        archetypes.join("cave_slime.ron"),
        include_str!("../../game/content/data/archetypes/cave_slime.ron"),
    )
    .unwrap();

    let factory = ContentFactory::new(dir.path());
    let runtime = Runtime::builder()
        .engine(factory.load_config().unwrap())
        .registry(factory.load_registry().unwrap())
        .build()
        .await
        .unwrap();
    let handle = runtime.handle();

    let id = handle.spawn("cave_slime", Vec2::ZERO).await.unwrap();
    let king = handle.spawn("slime_king", Vec2::new(20.0, 0.0)).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.agent(id).unwrap().health.maximum(), 160);
    assert_eq!(snapshot.agent(king).unwrap().archetype, "slime_king");

    runtime.shutdown().await.unwrap();
}
