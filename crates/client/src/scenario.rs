//! One agent, one walking target, a hit schedule.
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use game_core::{AgentId, Vec2};
use runtime::{Event, Runtime};

use crate::cli::{Hit, Settings};
use crate::report::Summary;

/// The target stops walking once it is this close.
const STOP_DISTANCE: f32 = 1.0;
/// Contact damage is applied when the target is at least this close.
const CONTACT_RADIUS: f32 = 0.75;
/// Seconds the target is immune after taking contact damage.
const CONTACT_IMMUNITY: f32 = 1.0;
const AGENT_ORIGIN: Vec2 = Vec2::ZERO;

/// Scripted target that walks straight at the agent.
#[derive(Clone, Copy, Debug)]
pub struct Walker {
    position: Vec2,
    speed: f32,
}

impl Walker {
    pub fn new(position: Vec2, speed: f32) -> Self {
        Self { position, speed }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn advance(&mut self, toward: Option<Vec2>, dt: f32) -> Vec2 {
        if let Some(goal) = toward {
            let offset = goal - self.position;
            let distance = offset.length();
            if distance > STOP_DISTANCE {
                let step = (self.speed * dt).min(distance - STOP_DISTANCE);
                self.position = self.position + offset.normalized() * step;
            }
        }
        self.position
    }
}

/// Runs the scenario and returns its summary.
///
/// `on_event` sees every drained event with the simulated time it was
/// drained at.
pub async fn run(settings: Settings, mut on_event: impl FnMut(&Event, f32)) -> Result<Summary> {
    let Settings {
        engine,
        registry,
        archetype,
        ticks,
        distance,
        walk_speed,
        hits,
        ..
    } = settings;
    let dt = engine.tick_seconds();

    let runtime = Runtime::builder()
        .engine(engine)
        .registry(registry)
        .observe_deaths(Arc::new(|agent: AgentId, archetype: &str| {
            info!(agent = %agent, archetype, "agent died");
        }))
        .build()
        .await?;
    let handle = runtime.handle();

    let mut walker = Walker::new(AGENT_ORIGIN + Vec2::new(distance, 0.0), walk_speed);
    handle.place(AgentId::PLAYER, walker.position()).await?;
    let agent = handle.spawn(archetype.clone(), AGENT_ORIGIN).await?;
    let max_health = handle
        .snapshot()
        .await?
        .agent(agent)
        .map(|snapshot| snapshot.health.maximum())
        .context("spawned agent missing from the world")?;
    info!(%agent, archetype = %archetype, max_health, ticks, "simulation started");

    let mut summary = Summary::new(archetype, agent, max_health);
    let mut schedule = hits.into_iter().peekable();
    let mut immunity = 0.0_f32;
    let mut ticks_run = 0_u64;

    for tick in 0..ticks {
        let now = tick as f32 * dt;
        while let Some(hit) = schedule.next_if(|hit: &Hit| hit.at <= now + dt * 0.5) {
            let landed = handle.apply_damage(agent, hit.amount).await?;
            debug!(%hit, landed, "scheduled hit");
        }

        let agent_position = handle.position(agent).await?;
        let target = walker.advance(agent_position, dt);
        handle.place(AgentId::PLAYER, target).await?;

        immunity = (immunity - dt).max(0.0);
        let touching = agent_position.is_some_and(|at| at.distance(target) <= CONTACT_RADIUS);
        if touching
            && immunity <= 0.0
            && handle.contact(agent, AgentId::PLAYER).await?.is_some()
        {
            immunity = CONTACT_IMMUNITY;
        }

        let reports = handle.step(1).await?;
        ticks_run += 1;
        for report in &reports {
            let seconds = report.tick as f32 * dt;
            for event in &report.events {
                summary.record(event, seconds);
                on_event(event, seconds);
            }
        }
        if summary.despawned_at.is_some() {
            break;
        }
    }

    let snapshot = handle.snapshot().await?;
    summary.finish(ticks_run, ticks_run as f32 * dt, snapshot.agent(agent));
    runtime.shutdown().await?;

    info!(ticks = ticks_run, "simulation finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use game_core::BehaviorState;

    use super::*;
    use crate::cli::Args;

    fn settings(argv: &[&str]) -> Settings {
        let args = Args::try_parse_from(std::iter::once("agent-sim").chain(argv.iter().copied()))
            .unwrap();
        Settings::resolve(args).unwrap()
    }

    #[test]
    fn walker_stops_short_of_the_agent() {
        let mut walker = Walker::new(Vec2::new(3.0, 0.0), 2.0);
        walker.advance(Some(Vec2::ZERO), 0.5);
        assert_eq!(walker.position(), Vec2::new(2.0, 0.0));
        walker.advance(Some(Vec2::ZERO), 5.0);
        assert_eq!(walker.position(), Vec2::new(1.0, 0.0));
        walker.advance(None, 1.0);
        assert_eq!(walker.position(), Vec2::new(1.0, 0.0));
    }

    #[tokio::test]
    async fn slime_king_runs_through_both_phases() {
        let settings = settings(&[
            "--preset",
            "slime_king",
            "--ticks",
            "300",
            "--distance",
            "10",
            "--hit",
            "240@0.5",
            "--hit",
            "170@1.0",
        ]);
        let mut lines = 0;
        let summary = run(settings, |_, _| lines += 1).await.unwrap();

        assert_eq!(summary.thresholds, vec![400, 300, 250, 200, 100]);
        assert_eq!(summary.phases, vec!["phase_two".to_owned()]);
        assert_eq!(summary.hits_landed, 2);
        assert_eq!(summary.final_phase, Some(1));
        assert_eq!(summary.final_health, Some(90));
        assert_eq!(summary.events, lines);
        assert!(summary.states_visited.contains(&BehaviorState::Rampage));
    }

    #[tokio::test]
    async fn lethal_hit_ends_with_a_despawn() {
        let settings = settings(&["--preset", "slime", "--ticks", "500", "--hit", "150@0.2"]);
        let summary = run(settings, |_, _| {}).await.unwrap();

        assert!(summary.died_at.is_some());
        assert!(summary.despawned_at.is_some());
        assert!(summary.ticks < 500);
        assert_eq!(summary.final_state, None);
    }
}
