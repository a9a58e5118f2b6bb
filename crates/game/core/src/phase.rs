//! Phase controller: which of an agent's state machines is evaluating guards.
//!
//! Bosses own several phase machines. Threshold reactions either trigger a
//! special state on the active machine or swap to another phase. Exactly one
//! machine is enabled at a time; while a phase intro runs, none is, and
//! specials that arrive meanwhile are latched until the intro completes.
use std::sync::Arc;

use sequencer::{ActionSequence, SequenceHandle, Sequencer};
use tracing::{debug, warn};

use crate::body::{AgentBody, StateRequest};
use crate::error::EngineError;
use crate::events::AgentEvent;
use crate::machine::{Origin, StateMachine};
use crate::threshold::ThresholdDispatcher;
use crate::types::BehaviorState;

/// What a fired threshold does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reaction {
    /// Enter a special state on the active phase machine.
    Special(BehaviorState),
    /// Disable the active phase and enable the phase at this index.
    AdvancePhase(usize),
    /// Enter the terminal state.
    Death,
}

/// A threshold-triggered special owned by one phase.
///
/// The phase subscribes it while enabled and unsubscribes it when disabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpecialTrigger {
    pub at: i32,
    pub state: BehaviorState,
}

impl SpecialTrigger {
    fn reaction(&self) -> Reaction {
        Reaction::Special(self.state)
    }
}

/// One phase: a machine plus the specials it listens for.
#[derive(Debug)]
pub struct Phase {
    name: String,
    machine: StateMachine,
    specials: Vec<SpecialTrigger>,
    intro: Option<Arc<ActionSequence<AgentBody>>>,
}

impl Phase {
    pub fn new(name: impl Into<String>, machine: StateMachine) -> Self {
        Self {
            name: name.into(),
            machine,
            specials: Vec::new(),
            intro: None,
        }
    }

    pub fn with_specials(mut self, specials: Vec<SpecialTrigger>) -> Self {
        self.specials = specials;
        self
    }

    /// Transitional lock run before this phase's machine is enabled.
    pub fn with_intro(mut self, intro: Arc<ActionSequence<AgentBody>>) -> Self {
        self.intro = Some(intro);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn specials(&self) -> &[SpecialTrigger] {
        &self.specials
    }
}

#[derive(Clone, Copy, Debug)]
struct IntroLock {
    handle: SequenceHandle,
    to: usize,
}

/// Switches an agent between its phase machines.
#[derive(Debug)]
pub struct PhaseController {
    phases: Vec<Phase>,
    active: usize,
    lock: Option<IntroLock>,
    latched: Vec<BehaviorState>,
}

impl PhaseController {
    /// # Panics
    ///
    /// Panics if `phases` is empty; an agent always has a phase.
    pub fn new(phases: Vec<Phase>) -> Self {
        assert!(!phases.is_empty(), "PhaseController must have at least one phase");
        Self {
            phases,
            active: 0,
            lock: None,
            latched: Vec::new(),
        }
    }

    /// Subscribes the first phase and enters its initial state.
    pub fn start(
        &mut self,
        dispatcher: &mut ThresholdDispatcher<Reaction>,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) {
        self.subscribe(self.active, dispatcher);
        self.phases[self.active]
            .machine
            .enable(None, body, sequencer);
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Phase {
        &self.phases[self.active]
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phase whose intro is currently running.
    pub fn locked_into(&self) -> Option<usize> {
        self.lock.map(|lock| lock.to)
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// State of the active machine (the outgoing one during an intro lock).
    pub fn current_state(&self) -> BehaviorState {
        self.phases[self.active].machine.current()
    }

    pub fn is_dead(&self) -> bool {
        self.phases[self.active].machine.is_terminal()
    }

    pub fn contact_damage(&self) -> Option<i32> {
        if self.is_locked() {
            return None;
        }
        self.phases[self.active].machine.contact_damage()
    }

    /// Evaluates the enabled machine. Nothing runs during an intro lock.
    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) -> Option<BehaviorState> {
        if self.is_locked() {
            return None;
        }
        self.phases[self.active].machine.tick(body, sequencer)
    }

    /// Enters `state` on the enabled machine, or latches it during a lock.
    ///
    /// A special is not re-entrant: triggering the state the machine is
    /// already in leaves the running sequence alone.
    pub fn trigger_special(
        &mut self,
        state: BehaviorState,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) {
        if self.is_locked() {
            if self.latched.contains(&state) {
                debug!(target: "game_core::phase", agent = %body.id(), %state, "special already latched");
                return;
            }
            debug!(target: "game_core::phase", agent = %body.id(), %state, "special latched during intro");
            self.latched.push(state);
            return;
        }
        let machine = &mut self.phases[self.active].machine;
        if machine.is_terminal() {
            return;
        }
        if machine.current() == state {
            debug!(target: "game_core::phase", agent = %body.id(), %state, "special already running");
            return;
        }
        if let Err(error) = machine.transition(state, Origin::External, body, sequencer) {
            warn!(target: "game_core::phase", %error, "special refused");
        }
    }

    /// Disables the active phase and moves to `index`.
    ///
    /// The outgoing phase's specials are unsubscribed and its sequence is
    /// cancelled. The incoming phase's specials are subscribed immediately,
    /// so thresholds crossed by the same report still reach them. If the
    /// phase has an intro it runs as a lock before the machine is enabled.
    pub fn advance_to(
        &mut self,
        index: usize,
        dispatcher: &mut ThresholdDispatcher<Reaction>,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) -> Result<(), EngineError> {
        if index >= self.phases.len() {
            return Err(EngineError::UnknownPhase {
                agent: body.id(),
                index,
            });
        }
        if self.is_dead() || (index == self.active && !self.is_locked()) {
            return Ok(());
        }

        let from = self.active;
        self.unsubscribe(from, dispatcher);
        if let Some(lock) = self.lock.take() {
            self.unsubscribe(lock.to, dispatcher);
            cancel(lock.handle, body, sequencer);
        }
        self.phases[from].machine.cancel_bound(body, sequencer);
        self.subscribe(index, dispatcher);

        debug!(target: "game_core::phase", agent = %body.id(), from, to = index, "phase change");
        let agent = body.id();
        body.emit(AgentEvent::PhaseChanged {
            agent,
            from,
            to: index,
            name: self.phases[index].name.clone(),
        });

        match self.phases[index].intro.clone() {
            Some(intro) => {
                body.stop();
                let handle = sequencer.start(Arc::clone(&intro), body);
                body.emit(AgentEvent::SequenceStarted {
                    agent,
                    handle: handle.raw(),
                    name: intro.name().to_owned(),
                });
                self.lock = Some(IntroLock { handle, to: index });
                if !sequencer.is_active(handle) {
                    body.push_finished(handle);
                }
            }
            None => self.enable(index, body, sequencer),
        }
        Ok(())
    }

    /// Routes a finished sequence to the intro lock or the enabled machine.
    pub fn on_sequence_complete(
        &mut self,
        handle: SequenceHandle,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) {
        match self.lock {
            Some(lock) if lock.handle == handle => self.enable(lock.to, body, sequencer),
            Some(_) => {}
            None => self.phases[self.active]
                .machine
                .on_sequence_complete(handle, body, sequencer),
        }
    }

    pub(crate) fn request(
        &mut self,
        request: StateRequest,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) {
        if self.is_locked() {
            debug!(target: "game_core::phase", agent = %body.id(), state = %request.state, "request dropped during intro");
            return;
        }
        if let Err(error) = self.phases[self.active]
            .machine
            .request(request, body, sequencer)
        {
            warn!(target: "game_core::phase", %error, "state request refused");
        }
    }

    /// Lets the enabled machine react to a hit. Returns `true` if it moved.
    pub fn on_hit(&mut self, body: &mut AgentBody, sequencer: &mut Sequencer<AgentBody>) -> bool {
        if self.is_locked() {
            return false;
        }
        self.phases[self.active].machine.on_hit(body, sequencer)
    }

    /// Enters `Death` on whichever machine is (or is about to be) enabled.
    ///
    /// Returns `false` if the agent was already dead.
    pub fn die(&mut self, body: &mut AgentBody, sequencer: &mut Sequencer<AgentBody>) -> bool {
        if let Some(lock) = self.lock.take() {
            cancel(lock.handle, body, sequencer);
            self.active = lock.to;
        }
        self.latched.clear();

        let machine = &mut self.phases[self.active].machine;
        if machine.is_terminal() {
            return false;
        }
        match machine.transition(BehaviorState::Death, Origin::External, body, sequencer) {
            Ok(()) => true,
            Err(error) => {
                warn!(target: "game_core::phase", %error, "death refused");
                false
            }
        }
    }

    fn enable(&mut self, index: usize, body: &mut AgentBody, sequencer: &mut Sequencer<AgentBody>) {
        let previous = self.phases[self.active].machine.current();
        self.lock = None;
        self.active = index;
        self.phases[index]
            .machine
            .enable(Some(previous), body, sequencer);

        let agent = body.id();
        body.emit(AgentEvent::PhaseEnabled { agent, index });

        for state in std::mem::take(&mut self.latched) {
            self.trigger_special(state, body, sequencer);
        }
    }

    fn subscribe(&self, index: usize, dispatcher: &mut ThresholdDispatcher<Reaction>) {
        for special in &self.phases[index].specials {
            dispatcher.register_with(special.at, special.reaction());
        }
    }

    fn unsubscribe(&self, index: usize, dispatcher: &mut ThresholdDispatcher<Reaction>) {
        for special in &self.phases[index].specials {
            dispatcher.unsubscribe(special.at, &special.reaction());
        }
    }
}

fn cancel(handle: SequenceHandle, body: &mut AgentBody, sequencer: &mut Sequencer<AgentBody>) {
    if sequencer.cancel(handle) {
        let agent = body.id();
        body.emit(AgentEvent::SequenceCancelled {
            agent,
            handle: handle.raw(),
        });
    }
}
