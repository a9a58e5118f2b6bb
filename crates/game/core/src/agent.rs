//! A simulated enemy or boss instance.
//!
//! An [`Agent`] composes four disjoint parts: its [`AgentBody`] blackboard,
//! the [`PhaseController`] holding its state machines, the [`Sequencer`]
//! running its single active sequence, and the [`ThresholdDispatcher`]
//! watching its health. External calls (`report`, `apply_damage`, `tick`)
//! lend the parts to each other and then settle whatever state requests and
//! sequence completions the call produced.
use std::sync::Arc;

use sequencer::{Sequencer, TIME_EPSILON};
use tracing::{debug, info, warn};

use crate::archetype::Archetype;
use crate::body::AgentBody;
use crate::config::EngineConfig;
use crate::events::AgentEvent;
use crate::facts::Facts;
use crate::machine::StateMachine;
use crate::phase::{Phase, PhaseController, Reaction};
use crate::ports::Ports;
use crate::threshold::ThresholdDispatcher;
use crate::types::{AgentFlags, AgentId, BehaviorState, Health, Vec2};

/// Per-agent spawn parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnOptions {
    pub target: AgentId,
    /// RNG seed; defaults to the agent id.
    pub seed: Option<u64>,
    /// Step advances (and settled requests) allowed per call.
    pub advance_budget: usize,
}

impl SpawnOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            advance_budget: config.max_step_advances_per_tick,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn targeting(mut self, target: AgentId) -> Self {
        self.target = target;
        self
    }
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            target: AgentId::PLAYER,
            seed: None,
            advance_budget: EngineConfig::DEFAULT_MAX_STEP_ADVANCES,
        }
    }
}

/// Point-in-time view of an agent.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub archetype: String,
    pub state: BehaviorState,
    pub phase: usize,
    pub phase_locked: bool,
    pub health: Health,
    pub flags: AgentFlags,
    pub velocity: Vec2,
    pub sequence: Option<String>,
    pub step: Option<String>,
    pub despawned: bool,
}

pub struct Agent {
    archetype: String,
    body: AgentBody,
    phases: PhaseController,
    sequencer: Sequencer<AgentBody>,
    dispatcher: ThresholdDispatcher<Reaction>,
    settle_budget: usize,
    death_linger: f32,
    linger_remaining: Option<f32>,
    despawned: bool,
}

impl Agent {
    /// Creates an agent from a compiled archetype and enters its first phase.
    ///
    /// The death threshold (`health <= 0`) is always registered. Thresholds of
    /// phases other than the first are registered without listeners so they
    /// keep their one-shot history from the start.
    pub fn spawn(archetype: &Archetype, id: AgentId, ports: Ports, options: SpawnOptions) -> Self {
        let spec = archetype.spec();
        let seed = options.seed.unwrap_or(u64::from(id.0));
        let mut body = AgentBody::new(id, options.target, spec.max_health, ports, seed)
            .with_patrol(spec.patrol.points.clone(), spec.patrol.tolerance)
            .with_waypoints(spec.waypoints.clone());
        for range in &archetype.lost_ranges {
            body.track_lost_range(*range);
        }

        let phases = archetype
            .phases
            .iter()
            .map(|compiled| {
                let machine = StateMachine::new(Arc::clone(&compiled.table));
                let phase =
                    Phase::new(compiled.name.clone(), machine).with_specials(compiled.specials.clone());
                match &compiled.intro {
                    Some(intro) => phase.with_intro(Arc::clone(intro)),
                    None => phase,
                }
            })
            .collect();

        let mut dispatcher = ThresholdDispatcher::new();
        dispatcher.register_with(0, Reaction::Death);
        for threshold in &spec.thresholds {
            dispatcher.register_with(threshold.at, threshold.reaction);
        }
        for special in archetype.phases.iter().flat_map(|phase| &phase.specials) {
            dispatcher.register(special.at);
        }

        let mut agent = Self {
            archetype: archetype.name().to_owned(),
            body,
            phases: PhaseController::new(phases),
            sequencer: Sequencer::new().with_advance_budget(options.advance_budget),
            dispatcher,
            settle_budget: options.advance_budget.max(1),
            death_linger: archetype.death_linger(),
            linger_remaining: None,
            despawned: false,
        };

        let Agent {
            body,
            phases,
            sequencer,
            dispatcher,
            ..
        } = &mut agent;
        phases.start(dispatcher, body, sequencer);
        agent.settle();

        debug!(
            target: "game_core::agent",
            agent = %id,
            archetype = %agent.archetype,
            state = %agent.state(),
            "spawned"
        );
        agent
    }

    // ===== external entry points =====

    /// Reports a new health value and fires every newly crossed threshold,
    /// highest first, before returning.
    ///
    /// Returns the fired threshold values in firing order.
    pub fn report(&mut self, new_health: i32) -> Vec<i32> {
        if self.despawned || self.phases.is_dead() {
            return Vec::new();
        }
        let fired = self.fire_thresholds(new_health);
        self.settle();
        fired
    }

    fn fire_thresholds(&mut self, new_health: i32) -> Vec<i32> {
        self.body.set_health(new_health);
        let health = self.body.health().current();

        let Agent {
            body,
            phases,
            sequencer,
            dispatcher,
            ..
        } = self;
        let fired = dispatcher.report(health, |dispatcher, value, listeners| {
            debug!(target: "game_core::threshold", agent = %body.id(), value, health, "threshold crossed");
            let agent = body.id();
            body.emit(AgentEvent::ThresholdCrossed { agent, value });

            for reaction in listeners {
                match reaction {
                    Reaction::Special(state) => phases.trigger_special(state, body, sequencer),
                    Reaction::AdvancePhase(index) => {
                        if let Err(error) = phases.advance_to(index, dispatcher, body, sequencer) {
                            warn!(target: "game_core::agent", %error, "phase change refused");
                        }
                    }
                    Reaction::Death => {
                        if phases.die(body, sequencer) {
                            info!(target: "game_core::agent", agent = %agent, "died");
                            body.emit(AgentEvent::Died { agent });
                        }
                    }
                }
            }
        });
        fired
    }

    /// Damage sink: subtracts `amount` and reports the result.
    ///
    /// Ignored while untouchable or blocking, after death, and for
    /// non-positive amounts. A hit first lets the current state react (e.g.
    /// a bullet-hell volley is interrupted), then thresholds are evaluated.
    /// Returns `true` if the damage was applied.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        if self.despawned || self.phases.is_dead() || amount <= 0 {
            return false;
        }
        let agent = self.body.id();
        if self.body.flags().ignores_damage() {
            debug!(target: "game_core::agent", agent = %agent, amount, flags = ?self.body.flags(), "damage ignored");
            self.body.emit(AgentEvent::DamageIgnored { agent, amount });
            return false;
        }

        let health = (self.body.health().current() - amount).max(0);
        self.body.mark_hit();
        self.body.emit(AgentEvent::Damaged {
            agent,
            amount,
            health,
        });

        let Agent {
            body,
            phases,
            sequencer,
            ..
        } = self;
        phases.on_hit(body, sequencer);
        self.settle();

        self.report(health);
        true
    }

    /// Restores health. Fired thresholds stay fired.
    pub fn heal(&mut self, amount: i32) {
        if self.despawned || self.phases.is_dead() || amount <= 0 {
            return;
        }
        let health = self.body.health().current().saturating_add(amount);
        self.body.set_health(health);
        let agent = self.body.id();
        let health = self.body.health().current();
        self.body.emit(AgentEvent::Healed { agent, health });
    }

    /// Advances the agent by one simulation tick.
    ///
    /// Order: clocks, the active sequence, settled requests, then the enabled
    /// machine's guards (or the death linger).
    pub fn tick(&mut self, facts: Facts, dt: f32) {
        if self.despawned {
            return;
        }
        let dt = dt.max(0.0);
        self.body.observe(facts);
        self.body.advance_clocks(dt);

        self.body.set_driving(true);
        let progress = self.sequencer.tick(&mut self.body, dt);
        self.body.set_driving(false);
        if let Some(handle) = progress.completed() {
            self.body.push_finished(handle);
        }
        self.settle();

        if self.phases.is_dead() {
            self.linger(dt);
        } else {
            let Agent {
                body,
                phases,
                sequencer,
                ..
            } = self;
            phases.tick(body, sequencer);
            self.settle();
        }
        self.body.end_tick();
    }

    /// Contact with `other`. Returns the contact damage dealt, if the current
    /// state deals any.
    pub fn contact(&mut self, other: AgentId) -> Option<i32> {
        if self.despawned || self.phases.is_dead() {
            return None;
        }
        let amount = self.phases.contact_damage()?;
        let agent = self.body.id();
        self.body.emit(AgentEvent::DamageDealt {
            agent,
            target: other,
            amount,
        });
        Some(amount)
    }

    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        self.body.drain_events()
    }

    // ===== read access =====

    pub fn id(&self) -> AgentId {
        self.body.id()
    }

    pub fn target(&self) -> AgentId {
        self.body.target()
    }

    pub fn archetype(&self) -> &str {
        &self.archetype
    }

    pub fn state(&self) -> BehaviorState {
        self.phases.current_state()
    }

    pub fn health(&self) -> Health {
        self.body.health()
    }

    pub fn flags(&self) -> AgentFlags {
        self.body.flags()
    }

    pub fn is_dead(&self) -> bool {
        self.phases.is_dead()
    }

    pub fn is_despawned(&self) -> bool {
        self.despawned
    }

    pub fn phases(&self) -> &PhaseController {
        &self.phases
    }

    pub fn dispatcher(&self) -> &ThresholdDispatcher<Reaction> {
        &self.dispatcher
    }

    pub fn body(&self) -> &AgentBody {
        &self.body
    }

    pub fn active_sequence(&self) -> Option<&str> {
        self.sequencer.active_name()
    }

    pub fn current_step(&self) -> Option<&str> {
        self.sequencer.current_step()
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id(),
            archetype: self.archetype.clone(),
            state: self.state(),
            phase: self.phases.active_index(),
            phase_locked: self.phases.is_locked(),
            health: self.health(),
            flags: self.flags(),
            velocity: self.body.velocity(),
            sequence: self.active_sequence().map(str::to_owned),
            step: self.current_step().map(str::to_owned),
            despawned: self.despawned,
        }
    }

    // ===== internals =====

    /// Processes self-destructs, state requests and finished sequences until
    /// none are left.
    ///
    /// Requests go first: a step that asked for a state before its sequence
    /// ended has already moved the machine, so the completion then sees a
    /// preempted state and does not resume.
    fn settle(&mut self) {
        for _ in 0..self.settle_budget {
            if self.body.take_self_destruct() {
                if !self.phases.is_dead() {
                    debug!(target: "game_core::agent", agent = %self.body.id(), "self-destruct");
                    self.fire_thresholds(0);
                }
                continue;
            }
            let Agent {
                body,
                phases,
                sequencer,
                ..
            } = self;
            if let Some(request) = body.take_request() {
                phases.request(request, body, sequencer);
                continue;
            }
            if let Some(handle) = body.take_finished() {
                debug!(target: "game_core::agent", agent = %body.id(), sequence = %handle, "sequence completed");
                let agent = body.id();
                body.emit(AgentEvent::SequenceCompleted {
                    agent,
                    handle: handle.raw(),
                });
                phases.on_sequence_complete(handle, body, sequencer);
                continue;
            }
            return;
        }
        warn!(
            target: "game_core::agent",
            agent = %self.body.id(),
            budget = self.settle_budget,
            "settle budget exhausted; remaining work deferred"
        );
    }

    fn linger(&mut self, dt: f32) {
        let remaining = self.linger_remaining.get_or_insert(self.death_linger);
        *remaining -= dt;
        if *remaining <= TIME_EPSILON {
            self.despawned = true;
            self.sequencer.cancel_active();
            let agent = self.body.id();
            debug!(target: "game_core::agent", agent = %agent, "despawned");
            self.body.emit(AgentEvent::Despawned { agent });
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.body.id())
            .field("archetype", &self.archetype)
            .field("state", &self.state())
            .field("health", &self.body.health())
            .field("phase", &self.phases.active_index())
            .finish_non_exhaustive()
    }
}
