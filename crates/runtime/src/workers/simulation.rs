//! Simulation worker that owns the authoritative [`World`].
//!
//! Receives commands from [`RuntimeHandle`](crate::RuntimeHandle), advances
//! the world on request or on a fixed interval, and lets the world publish
//! its events to the bus.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use game_content::ArchetypeRegistry;
use game_core::{AgentId, Vec2};

use crate::api::{Result, RuntimeError};
use crate::world::{TickReport, World, WorldSnapshot};

/// Commands that can be sent to the simulation worker
pub enum Command {
    /// Advance the world by `ticks` fixed steps.
    Step {
        ticks: u32,
        reply: oneshot::Sender<Vec<TickReport>>,
    },
    /// Damage an agent immediately.
    ApplyDamage {
        agent: AgentId,
        amount: i32,
        reply: oneshot::Sender<Result<bool>>,
    },
    /// Spawn a registered archetype.
    Spawn {
        archetype: String,
        position: Vec2,
        reply: oneshot::Sender<Result<AgentId>>,
    },
    /// Remove an agent without a death linger.
    Despawn {
        agent: AgentId,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Touch an agent; replies with the contact damage it deals.
    Contact {
        agent: AgentId,
        other: AgentId,
        reply: oneshot::Sender<Result<Option<i32>>>,
    },
    /// Move an entity the world does not simulate.
    Place { entity: AgentId, position: Vec2 },
    /// Where an entity currently is.
    Position {
        entity: AgentId,
        reply: oneshot::Sender<Option<Vec2>>,
    },
    /// Query a read-only view of every agent.
    Snapshot { reply: oneshot::Sender<WorldSnapshot> },
    /// Stop the worker loop.
    Shutdown,
}

/// Background task that processes simulation commands.
pub struct SimulationWorker {
    world: World,
    registry: ArchetypeRegistry,
    command_rx: mpsc::Receiver<Command>,
    period: Option<Duration>,
}

impl SimulationWorker {
    /// Creates a new simulation worker.
    ///
    /// With a `period` the world also advances on its own at that interval.
    pub fn new(
        world: World,
        registry: ArchetypeRegistry,
        command_rx: mpsc::Receiver<Command>,
        period: Option<Duration>,
    ) -> Self {
        info!(
            "SimulationWorker initialized with {} agents, {} archetypes, free-running: {}",
            world.len(),
            registry.len(),
            period.is_some()
        );

        Self {
            world,
            registry,
            command_rx,
            period,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        let mut ticker = self.period.map(|period| {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                _ = next_tick(&mut ticker) => {
                    self.world.tick();
                }
            }
        }

        info!(tick = self.world.tick_count(), "SimulationWorker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Step { ticks, reply } => {
                let reports: Vec<TickReport> = (0..ticks).map(|_| self.world.tick()).collect();
                if reply.send(reports).is_err() {
                    debug!("Step reply channel closed (caller dropped)");
                }
            }
            Command::ApplyDamage {
                agent,
                amount,
                reply,
            } => {
                let result = self.world.apply_damage(agent, amount);
                if reply.send(result).is_err() {
                    debug!("ApplyDamage reply channel closed (caller dropped)");
                }
            }
            Command::Spawn {
                archetype,
                position,
                reply,
            } => {
                let result = self.spawn(&archetype, position);
                if reply.send(result).is_err() {
                    debug!("Spawn reply channel closed (caller dropped)");
                }
            }
            Command::Despawn { agent, reply } => {
                let result = self.world.despawn(agent).map(drop);
                if reply.send(result).is_err() {
                    debug!("Despawn reply channel closed (caller dropped)");
                }
            }
            Command::Contact {
                agent,
                other,
                reply,
            } => {
                let result = self.world.contact(agent, other);
                if reply.send(result).is_err() {
                    debug!("Contact reply channel closed (caller dropped)");
                }
            }
            Command::Place { entity, position } => self.world.place(entity, position),
            Command::Position { entity, reply } => {
                if reply.send(self.world.position(entity)).is_err() {
                    debug!("Position reply channel closed (caller dropped)");
                }
            }
            Command::Snapshot { reply } => {
                if reply.send(self.world.snapshot()).is_err() {
                    debug!("Snapshot reply channel closed (caller dropped)");
                }
            }
            Command::Shutdown => {}
        }
    }

    fn spawn(&mut self, name: &str, position: Vec2) -> Result<AgentId> {
        let Some(archetype) = self.registry.get(name) else {
            warn!(archetype = name, "spawn requested for unknown archetype");
            return Err(RuntimeError::UnknownArchetype(name.to_owned()));
        };
        Ok(self.world.spawn(&archetype, position))
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
