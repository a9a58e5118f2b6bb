use std::sync::Arc;

use sequencer::{SequenceHandle, Sequencer};
use tracing::{debug, warn};

use super::table::{CompiledState, CompiledTable, Movement};
use crate::body::{AgentBody, StateRequest};
use crate::error::EngineError;
use crate::events::AgentEvent;
use crate::types::BehaviorState;

/// Who asked for a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Guards, thresholds, hits and completions. The running sequence is cancelled.
    External,
    /// The running sequence itself; it keeps running in the new state.
    Continuation,
}

#[derive(Clone, Copy, Debug)]
struct Bound {
    handle: SequenceHandle,
    state: BehaviorState,
}

/// One phase's finite state machine.
///
/// The machine owns only its current state and the sequence it started; the
/// agent lends it the body and sequencer for every call.
#[derive(Debug)]
pub struct StateMachine {
    table: Arc<CompiledTable>,
    current: BehaviorState,
    bound: Option<Bound>,
}

impl StateMachine {
    pub fn new(table: Arc<CompiledTable>) -> Self {
        let current = table.initial();
        Self {
            table,
            current,
            bound: None,
        }
    }

    #[inline]
    pub fn current(&self) -> BehaviorState {
        self.current
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Sequence started by the current state, if still bound.
    pub fn bound_sequence(&self) -> Option<SequenceHandle> {
        self.bound.map(|bound| bound.handle)
    }

    pub fn table(&self) -> &CompiledTable {
        &self.table
    }

    /// Damage dealt on touch in the current state.
    pub fn contact_damage(&self) -> Option<i32> {
        self.table
            .get(self.current)
            .and_then(|state| state.spec.contact_damage)
    }

    /// Enters the initial state, e.g. when the owning phase becomes enabled.
    ///
    /// `previous` is the state shown before this machine took over.
    pub fn enable(
        &mut self,
        previous: Option<BehaviorState>,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) {
        let table = Arc::clone(&self.table);
        let initial = table.initial();
        self.current = initial;
        self.bound = None;
        body.reset_state_clock();
        if let Some(from) = previous {
            emit_change(body, from, initial);
        }
        if let Some(state) = table.get(initial) {
            self.enter(state, body, sequencer);
        }
    }

    /// Evaluates the current state's guards; the first satisfied one wins.
    ///
    /// Without a required target the machine drops to its safe state instead.
    /// Returns the state entered, if any.
    pub fn tick(
        &mut self,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) -> Option<BehaviorState> {
        if self.is_terminal() {
            return None;
        }
        let table = Arc::clone(&self.table);
        let state = table.get(self.current)?;

        let missing = if state.spec.requires_target {
            body.facts().require_target(body.id(), body.target()).err()
        } else {
            None
        };
        if let Some(error) = missing {
            let safe = table.safe_state();
            warn!(
                target: "game_core::machine",
                agent = %body.id(),
                state = %self.current,
                fallback = %safe,
                %error,
                "no valid facts"
            );
            let mut entered = None;
            if safe != self.current
                && self
                    .transition(safe, Origin::External, body, sequencer)
                    .is_ok()
            {
                entered = Some(safe);
            }
            body.stop();
            return entered;
        }

        let chosen = state
            .spec
            .transitions
            .iter()
            .find(|transition| transition.guard.evaluate(body))
            .map(|transition| transition.to);
        if let Some(to) = chosen {
            if to != self.current {
                return match self.transition(to, Origin::External, body, sequencer) {
                    Ok(()) => Some(to),
                    Err(error) => {
                        warn!(target: "game_core::machine", %error, "guarded transition refused");
                        None
                    }
                };
            }
        }

        match state.spec.movement {
            Movement::Hold => {}
            Movement::Patrol { speed } => body.patrol(speed),
            Movement::Chase { speed } => body.pursue(speed),
            Movement::FlyPatrol { speed } => body.fly_patrol(speed),
            Movement::FlyChase { speed } => body.fly_pursue(speed),
        }
        None
    }

    /// Moves to `to`.
    ///
    /// Refused out of `Death`. An external transition cancels the sequence the
    /// machine started; a continuation leaves it running. Motion intent is
    /// reset, then the new state's entry actions run and its sequence starts.
    pub fn transition(
        &mut self,
        to: BehaviorState,
        origin: Origin,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) -> Result<(), EngineError> {
        if self.is_terminal() {
            return Err(EngineError::InvalidTransition {
                agent: body.id(),
                from: self.current,
                to,
            });
        }
        let table = Arc::clone(&self.table);
        let Some(state) = table.get(to) else {
            return Err(EngineError::UnknownState {
                agent: body.id(),
                state: to,
            });
        };

        if origin == Origin::External {
            self.cancel_bound(body, sequencer);
        }

        let from = self.current;
        self.current = to;
        body.reset_state_clock();
        body.stop();
        emit_change(body, from, to);
        self.enter(state, body, sequencer);
        Ok(())
    }

    /// Settles a state request left by an effect.
    pub(crate) fn request(
        &mut self,
        request: StateRequest,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) -> Result<(), EngineError> {
        let origin = if request.continuation {
            Origin::Continuation
        } else {
            Origin::External
        };
        self.transition(request.state, origin, body, sequencer)
    }

    /// Handles the natural end of a sequence.
    ///
    /// Resumes only if the state that started the sequence is still current;
    /// a state that was preempted meanwhile is left alone.
    pub fn on_sequence_complete(
        &mut self,
        handle: SequenceHandle,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) {
        let Some(bound) = self.bound else {
            return;
        };
        if bound.handle != handle {
            return;
        }
        self.bound = None;

        if self.current != bound.state {
            debug!(
                target: "game_core::machine",
                agent = %body.id(),
                started_in = %bound.state,
                now = %self.current,
                "sequence finished after preemption; not resuming"
            );
            return;
        }

        let resume = self
            .table
            .get(bound.state)
            .and_then(|state| state.spec.resume);
        if let Some(resume) = resume {
            if let Err(error) = self.transition(resume, Origin::External, body, sequencer) {
                warn!(target: "game_core::machine", %error, "resume refused");
            }
        }
    }

    /// Applies the current state's hit interrupt, if it has one.
    pub fn on_hit(&mut self, body: &mut AgentBody, sequencer: &mut Sequencer<AgentBody>) -> bool {
        let interrupt = self
            .table
            .get(self.current)
            .and_then(|state| state.spec.interrupt_on_hit);
        match interrupt {
            Some(to) => self
                .transition(to, Origin::External, body, sequencer)
                .is_ok(),
            None => false,
        }
    }

    /// Cancels the sequence this machine started, if it is still running.
    pub fn cancel_bound(&mut self, body: &mut AgentBody, sequencer: &mut Sequencer<AgentBody>) {
        if let Some(bound) = self.bound.take() {
            if sequencer.cancel(bound.handle) {
                debug!(
                    target: "game_core::machine",
                    agent = %body.id(),
                    sequence = %bound.handle,
                    "sequence cancelled"
                );
                let agent = body.id();
                body.emit(AgentEvent::SequenceCancelled {
                    agent,
                    handle: bound.handle.raw(),
                });
            }
        }
    }

    fn enter(
        &mut self,
        state: &CompiledState,
        body: &mut AgentBody,
        sequencer: &mut Sequencer<AgentBody>,
    ) {
        for action in &state.spec.enter {
            action.apply(body);
        }

        let Some(program) = &state.program else {
            return;
        };
        if state.spec.state == BehaviorState::Death && body.self_destructed() {
            debug!(target: "game_core::machine", agent = %body.id(), "death sequence skipped after self-destruct");
            return;
        }
        self.cancel_bound(body, sequencer);

        body.set_driving(true);
        let handle = sequencer.start(Arc::clone(program), body);
        body.set_driving(false);

        self.bound = Some(Bound {
            handle,
            state: state.spec.state,
        });
        debug!(
            target: "game_core::machine",
            agent = %body.id(),
            sequence = %handle,
            name = program.name(),
            "sequence started"
        );
        let agent = body.id();
        body.emit(AgentEvent::SequenceStarted {
            agent,
            handle: handle.raw(),
            name: program.name().to_owned(),
        });
        if !sequencer.is_active(handle) {
            body.push_finished(handle);
        }
    }
}

fn emit_change(body: &mut AgentBody, from: BehaviorState, to: BehaviorState) {
    debug!(target: "game_core::machine", agent = %body.id(), %from, %to, "state transition");
    let agent = body.id();
    body.emit(AgentEvent::StateChanged { agent, from, to });
}
