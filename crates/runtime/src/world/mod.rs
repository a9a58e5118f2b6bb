//! Authoritative container for every agent in a simulation.
//!
//! The world owns agents in id order, a shared position table that serves as
//! their [`SpatialProvider`](game_core::SpatialProvider), and the damage that
//! agents deal to each other. Damage dealt during one tick is delivered at
//! the start of the next, so every agent observes the same tick.

mod kinematics;
mod observer;

pub use kinematics::Kinematics;
pub use observer::DeathObserver;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use game_core::{
    Agent, AgentEvent, AgentId, AgentSnapshot, Archetype, EngineConfig, Facts, PositionTable,
    Ports, PresentationSignal, SpatialProvider, SpawnOptions, Spawner, Vec2,
};

use crate::api::{Result, RuntimeError};
use crate::events::{Event, EventBus};

/// Damage one agent dealt to another entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strike {
    pub source: AgentId,
    pub target: AgentId,
    pub amount: i32,
}

/// Everything that happened during one [`World::tick`].
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<Event>,
    pub deaths: Vec<AgentId>,
    pub despawned: Vec<AgentId>,
    /// Damage aimed at entities the world does not own, such as the player.
    pub outgoing: Vec<Strike>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub agents: Vec<AgentSnapshot>,
}

impl WorldSnapshot {
    pub fn agent(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|agent| agent.id == id)
    }
}

pub struct World {
    config: EngineConfig,
    tick: u64,
    agents: BTreeMap<AgentId, Agent>,
    positions: Arc<PositionTable>,
    kinematics: Arc<Kinematics>,
    ports: Ports,
    pending: Vec<Strike>,
    observers: Vec<Arc<dyn DeathObserver>>,
    bus: EventBus,
    next_id: u32,
}

impl World {
    pub fn new(config: EngineConfig) -> Self {
        let positions = Arc::new(PositionTable::new());
        let kinematics = Arc::new(Kinematics::new(Arc::clone(&positions)));
        let ports = Ports::detached()
            .with_spatial(positions.clone())
            .with_motion(kinematics.clone());
        let bus = EventBus::with_capacity(config.event_buffer);

        Self {
            config,
            tick: 0,
            agents: BTreeMap::new(),
            positions,
            kinematics,
            ports,
            pending: Vec::new(),
            observers: Vec::new(),
            bus,
            next_id: 1,
        }
    }

    /// Routes presentation signals of agents spawned afterwards.
    pub fn with_presentation(mut self, presentation: Arc<dyn PresentationSignal>) -> Self {
        self.ports = self.ports.with_presentation(presentation);
        self
    }

    /// Routes summons of agents spawned afterwards.
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.ports = self.ports.with_spawner(spawner);
        self
    }

    /// Publishes drained events on `bus` instead of a private one.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn observe_deaths(&mut self, observer: Arc<dyn DeathObserver>) {
        self.observers.push(observer);
    }

    // ===== population =====

    /// Spawns an agent at `position` under the next free id.
    pub fn spawn(&mut self, archetype: &Archetype, position: Vec2) -> AgentId {
        let options = SpawnOptions::from_config(&self.config);
        self.spawn_with(archetype, position, options)
    }

    pub fn spawn_with(
        &mut self,
        archetype: &Archetype,
        position: Vec2,
        options: SpawnOptions,
    ) -> AgentId {
        while self.agents.contains_key(&AgentId(self.next_id)) {
            self.next_id += 1;
        }
        let id = AgentId(self.next_id);
        self.next_id += 1;
        self.insert(archetype, id, position, options);
        id
    }

    /// Spawns an agent under a caller-chosen id.
    pub fn spawn_as(
        &mut self,
        archetype: &Archetype,
        id: AgentId,
        position: Vec2,
        options: SpawnOptions,
    ) -> Result<()> {
        if self.agents.contains_key(&id) {
            return Err(RuntimeError::AgentExists(id));
        }
        self.insert(archetype, id, position, options);
        Ok(())
    }

    fn insert(&mut self, archetype: &Archetype, id: AgentId, position: Vec2, options: SpawnOptions) {
        self.positions.place(id, position);
        let agent = Agent::spawn(archetype, id, self.ports.clone(), options);
        info!(
            target: "runtime::world",
            agent = %id,
            archetype = archetype.name(),
            %position,
            "agent spawned"
        );
        self.agents.insert(id, agent);
    }

    /// Removes an agent immediately, without a death linger.
    pub fn despawn(&mut self, id: AgentId) -> Result<Agent> {
        let agent = self
            .agents
            .remove(&id)
            .ok_or(RuntimeError::UnknownAgent(id))?;
        self.forget(id);
        info!(target: "runtime::world", agent = %id, "agent removed");
        Ok(agent)
    }

    /// Places an entity the world does not simulate, such as the player.
    pub fn place(&self, entity: AgentId, position: Vec2) {
        self.positions.place(entity, position);
    }

    pub fn position(&self, entity: AgentId) -> Option<Vec2> {
        self.positions.position(entity)
    }

    // ===== damage =====

    /// Damages an agent right away. Thresholds fire before this returns.
    ///
    /// Returns whether the damage landed.
    pub fn apply_damage(&mut self, id: AgentId, amount: i32) -> Result<bool> {
        let agent = self
            .agents
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownAgent(id))?;
        Ok(agent.apply_damage(amount))
    }

    /// Touches `agent` with `other`; returns the contact damage it deals.
    pub fn contact(&mut self, agent: AgentId, other: AgentId) -> Result<Option<i32>> {
        let agent = self
            .agents
            .get_mut(&agent)
            .ok_or(RuntimeError::UnknownAgent(agent))?;
        Ok(agent.contact(other))
    }

    // ===== simulation =====

    /// Advances every agent by one fixed step.
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let dt = self.config.tick_seconds();
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        for strike in std::mem::take(&mut self.pending) {
            if let Some(agent) = self.agents.get_mut(&strike.target) {
                agent.apply_damage(strike.amount);
            }
        }

        for (id, agent) in self.agents.iter_mut() {
            let facts = Facts::gather(*id, agent.target(), &self.ports);
            agent.tick(facts, dt);
        }
        self.kinematics.integrate(dt);

        let hosted: BTreeSet<AgentId> = self.agents.keys().copied().collect();
        for (id, agent) in self.agents.iter_mut() {
            for payload in agent.drain_events() {
                match &payload {
                    AgentEvent::DamageDealt {
                        agent: source,
                        target,
                        amount,
                    } => {
                        let strike = Strike {
                            source: *source,
                            target: *target,
                            amount: *amount,
                        };
                        if *target != *id && hosted.contains(target) {
                            self.pending.push(strike);
                        } else {
                            report.outgoing.push(strike);
                        }
                    }
                    AgentEvent::Died { agent: dead } => {
                        report.deaths.push(*dead);
                        for observer in &self.observers {
                            observer.on_agent_death(*dead, agent.archetype());
                        }
                    }
                    AgentEvent::Despawned { agent: gone } => report.despawned.push(*gone),
                    _ => {}
                }
                let event = Event::new(self.tick, payload);
                self.bus.publish(event.clone());
                report.events.push(event);
            }
        }

        for id in &report.despawned {
            if self.agents.remove(id).is_some() {
                self.forget(*id);
                debug!(target: "runtime::world", agent = %id, "despawned after linger");
            }
        }

        report
    }

    fn forget(&self, id: AgentId) {
        self.positions.remove(id);
        self.kinematics.forget(id);
    }

    // ===== read access =====

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn elapsed(&self) -> f32 {
        self.tick as f32 * self.config.tick_seconds()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            agents: self.agents.values().map(Agent::snapshot).collect(),
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use game_core::{ArchetypeSpec, BehaviorState, PhaseSpec, StateSpec, TransitionTable};

    use super::*;

    fn dummy() -> Archetype {
        let table = TransitionTable::new(BehaviorState::Idle, BehaviorState::Idle)
            .state(StateSpec::new(BehaviorState::Idle));
        ArchetypeSpec::new("dummy", 100)
            .phase(PhaseSpec::new("main", table))
            .compile()
            .unwrap()
    }

    fn slime() -> Archetype {
        game_content::preset("slime").unwrap().compile().unwrap()
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let mut world = World::new(EngineConfig::default());
        let first = world.spawn(&dummy(), Vec2::ZERO);
        let second = world.spawn(&dummy(), Vec2::new(3.0, 0.0));
        assert_eq!((first, second), (AgentId(1), AgentId(2)));

        let taken = world.spawn_as(&dummy(), first, Vec2::ZERO, SpawnOptions::default());
        assert!(matches!(taken, Err(RuntimeError::AgentExists(AgentId(1)))));
        assert!(matches!(
            world.apply_damage(AgentId(9), 5),
            Err(RuntimeError::UnknownAgent(AgentId(9)))
        ));
    }

    #[test]
    fn damage_between_agents_lands_next_tick() {
        let mut world = World::new(EngineConfig::default());
        let victim = world.spawn(&dummy(), Vec2::new(1.0, 0.0));
        let options = SpawnOptions::from_config(world.config()).targeting(victim);
        let attacker = world.spawn_with(&slime(), Vec2::ZERO, options);

        let mut struck_at = None;
        for _ in 0..60 {
            let report = world.tick();
            if let Some(health) = world.agent(victim).map(|agent| agent.health().current())
                && health < 100
            {
                assert_eq!(health, 75);
                struck_at = Some(report.tick);
                break;
            }
            assert!(report.outgoing.is_empty());
        }

        assert!(struck_at.is_some(), "victim was never hit");
        assert_eq!(world.agent(attacker).unwrap().state(), BehaviorState::Melee);
    }

    #[test]
    fn strikes_on_the_player_are_reported() {
        let mut world = World::new(EngineConfig::default());
        world.place(AgentId::PLAYER, Vec2::new(1.0, 0.0));
        let slime = world.spawn(&slime(), Vec2::ZERO);

        let outgoing: Vec<Strike> = (0..60).flat_map(|_| world.tick().outgoing).collect();
        assert!(outgoing.contains(&Strike {
            source: slime,
            target: AgentId::PLAYER,
            amount: 25,
        }));
    }

    #[test]
    fn death_notifies_observers_then_despawns() {
        let mut world = World::new(EngineConfig::default().with_tick_rate(10));
        let deaths = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deaths);
        world.observe_deaths(Arc::new(move |agent: AgentId, archetype: &str| {
            sink.lock().unwrap().push((agent, archetype.to_owned()));
        }));

        let id = world.spawn(&dummy(), Vec2::ZERO);
        assert!(world.apply_damage(id, 150).unwrap());

        let first = world.tick();
        assert_eq!(first.deaths, vec![id]);
        assert_eq!(*deaths.lock().unwrap(), vec![(id, "dummy".to_owned())]);

        let mut despawned = Vec::new();
        for _ in 0..20 {
            despawned.extend(world.tick().despawned);
        }
        assert_eq!(despawned, vec![id]);
        assert!(world.is_empty());
        assert_eq!(world.position(id), None);
        assert_eq!(deaths.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn drained_events_reach_the_bus() {
        let mut world = World::new(EngineConfig::default());
        let mut lifecycle = world.bus().subscribe(crate::events::Topic::Lifecycle);
        let id = world.spawn(&dummy(), Vec2::ZERO);
        world.apply_damage(id, 100).unwrap();
        world.tick();

        let event = lifecycle.recv().await.unwrap();
        assert_eq!(event.tick, 1);
        assert_eq!(event.payload, AgentEvent::Died { agent: id });
    }

    #[test]
    fn snapshot_lists_agents_by_id() {
        let mut world = World::new(EngineConfig::default());
        let a = world.spawn(&dummy(), Vec2::ZERO);
        let b = world.spawn(&slime(), Vec2::new(2.0, 0.0));
        world.tick();

        let snapshot = world.snapshot();
        assert_eq!(snapshot.tick, 1);
        let ids: Vec<_> = snapshot.agents.iter().map(|agent| agent.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(snapshot.agent(b).unwrap().archetype, "slime");
    }
}
