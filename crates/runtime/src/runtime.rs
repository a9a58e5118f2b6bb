//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker, wires up command and event
//! channels, and exposes a builder-based API for clients to drive the world.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::warn;

use game_content::ArchetypeRegistry;
use game_core::{EngineConfig, PresentationSignal, Spawner};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::events::{Event, EventBus, Topic};
use crate::workers::{Command, SimulationWorker};
use crate::world::{DeathObserver, World};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub engine: EngineConfig,
    pub command_buffer_size: usize,
    /// Advance the world on its own at `engine.tick_rate_hz` (default: false)
    pub free_running: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            command_buffer_size: 32,
            free_running: false,
        }
    }
}

/// Main runtime that orchestrates the simulation
///
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    sim_worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Shutdown the runtime gracefully
    pub async fn shutdown(self) -> Result<()> {
        if let Err(error) = self.handle.shutdown().await {
            warn!(target: "runtime", %error, "simulation worker already stopped");
        }

        self.sim_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    registry: Option<ArchetypeRegistry>,
    observers: Vec<Arc<dyn DeathObserver>>,
    presentation: Option<Arc<dyn PresentationSignal>>,
    spawner: Option<Arc<dyn Spawner>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            registry: None,
            observers: Vec::new(),
            presentation: None,
            spawner: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.config.engine = engine;
        self
    }

    /// Archetypes the runtime can spawn by name.
    ///
    /// Defaults to the built-in presets.
    pub fn registry(mut self, registry: ArchetypeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Tick on a fixed interval in addition to explicit steps
    pub fn free_running(mut self, enable: bool) -> Self {
        self.config.free_running = enable;
        self
    }

    pub fn observe_deaths(mut self, observer: Arc<dyn DeathObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn presentation(mut self, presentation: Arc<dyn PresentationSignal>) -> Self {
        self.presentation = Some(presentation);
        self
    }

    pub fn spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Build the runtime and start its worker
    pub async fn build(self) -> Result<Runtime> {
        let engine = self.config.engine;
        if engine.tick_rate_hz == 0 {
            return Err(RuntimeError::InvalidTickRate);
        }

        let registry = match self.registry {
            Some(registry) => registry,
            None => ArchetypeRegistry::with_presets()?,
        };

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let event_bus = EventBus::with_capacity(engine.event_buffer);
        let handle = RuntimeHandle::new(command_tx, event_bus.clone());

        let period = self
            .config
            .free_running
            .then(|| Duration::from_secs_f32(engine.tick_seconds()));

        let mut world = World::new(engine).with_bus(event_bus);
        if let Some(presentation) = self.presentation {
            world = world.with_presentation(presentation);
        }
        if let Some(spawner) = self.spawner {
            world = world.with_spawner(spawner);
        }
        for observer in self.observers {
            world.observe_deaths(observer);
        }

        let sim_worker = SimulationWorker::new(world, registry, command_rx, period);
        let sim_worker_handle = tokio::spawn(async move {
            sim_worker.run().await;
        });

        Ok(Runtime {
            handle,
            sim_worker_handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_joins_a_worker_that_already_stopped() {
        let runtime = Runtime::builder().build().await.unwrap();
        let handle = runtime.handle();
        handle.shutdown().await.unwrap();

        runtime.shutdown().await.unwrap();
        assert!(matches!(
            handle.step(1).await,
            Err(RuntimeError::CommandChannelClosed)
        ));
    }
}
