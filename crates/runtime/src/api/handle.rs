//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! stepping the simulation or streaming events from specific topics.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use game_core::{AgentId, Vec2};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;
use crate::world::{TickReport, WorldSnapshot};

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Advance the world by `ticks` fixed steps and return one report per tick
    pub async fn step(&self, ticks: u32) -> Result<Vec<TickReport>> {
        self.request(|reply| Command::Step { ticks, reply }).await
    }

    /// Damage an agent; thresholds fire before the reply is sent
    pub async fn apply_damage(&self, agent: AgentId, amount: i32) -> Result<bool> {
        self.request(|reply| Command::ApplyDamage {
            agent,
            amount,
            reply,
        })
        .await?
    }

    /// Spawn a registered archetype by name
    pub async fn spawn(&self, archetype: impl Into<String>, position: Vec2) -> Result<AgentId> {
        let archetype = archetype.into();
        self.request(|reply| Command::Spawn {
            archetype,
            position,
            reply,
        })
        .await?
    }

    pub async fn despawn(&self, agent: AgentId) -> Result<()> {
        self.request(|reply| Command::Despawn { agent, reply })
            .await?
    }

    /// Touch `agent` with `other`; returns the contact damage dealt, if any
    pub async fn contact(&self, agent: AgentId, other: AgentId) -> Result<Option<i32>> {
        self.request(|reply| Command::Contact {
            agent,
            other,
            reply,
        })
        .await?
    }

    /// Move an entity the world does not simulate, such as the player
    pub async fn place(&self, entity: AgentId, position: Vec2) -> Result<()> {
        self.command_tx
            .send(Command::Place { entity, position })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }

    pub async fn position(&self, entity: AgentId) -> Result<Option<Vec2>> {
        self.request(|reply| Command::Position { entity, reply }).await
    }

    /// Query a read-only view of every agent
    pub async fn snapshot(&self) -> Result<WorldSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Behavior` - State changes and sequence lifecycle
    /// - `Topic::Combat` - Damage, thresholds and phase changes
    /// - `Topic::Lifecycle` - Death and despawn
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::Topic;
    ///
    /// let mut combat = handle.subscribe(Topic::Combat);
    /// while let Ok(event) = combat.recv().await {
    ///     // Handle damage and threshold events
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
