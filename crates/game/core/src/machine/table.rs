use std::collections::BTreeMap;
use std::sync::Arc;

use sequencer::ActionSequence;

use crate::action::{Action, SequenceSpec};
use crate::body::AgentBody;
use crate::error::SpecError;
use crate::guard::Guard;
use crate::types::BehaviorState;

/// A guarded edge out of a state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    pub guard: Guard,
    pub to: BehaviorState,
}

/// Per-tick motion while a state is current and no sequence overrides it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Movement {
    /// Leave the velocity intent alone (zeroed on entry).
    #[default]
    Hold,
    Patrol {
        speed: f32,
    },
    Chase {
        speed: f32,
    },
    /// Patrol in both axes (flyers).
    FlyPatrol {
        speed: f32,
    },
    /// Fly straight at the target.
    FlyChase {
        speed: f32,
    },
}

/// Everything a state does: guards out, entry actions, an optional sequence.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StateSpec {
    pub state: BehaviorState,
    /// Evaluated in order; the first satisfied guard wins.
    pub transitions: Vec<Transition>,
    pub enter: Vec<Action>,
    pub sequence: Option<SequenceSpec>,
    /// Where to go when the sequence completes while this state is still current.
    pub resume: Option<BehaviorState>,
    pub movement: Movement,
    /// Without a visible target the machine falls back to its safe state.
    pub requires_target: bool,
    /// Taking damage in this state cancels it and moves here instead.
    pub interrupt_on_hit: Option<BehaviorState>,
    /// Damage dealt to whoever touches the agent in this state.
    pub contact_damage: Option<i32>,
}

impl StateSpec {
    pub fn new(state: BehaviorState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn to(mut self, guard: Guard, to: BehaviorState) -> Self {
        self.transitions.push(Transition { guard, to });
        self
    }

    pub fn on_enter(mut self, action: Action) -> Self {
        self.enter.push(action);
        self
    }

    pub fn sequence(mut self, sequence: SequenceSpec, resume: BehaviorState) -> Self {
        self.sequence = Some(sequence);
        self.resume = Some(resume);
        self
    }

    /// Runs a sequence that has no resume state (terminal or externally ended).
    pub fn sequence_without_resume(mut self, sequence: SequenceSpec) -> Self {
        self.sequence = Some(sequence);
        self.resume = None;
        self
    }

    pub fn movement(mut self, movement: Movement) -> Self {
        self.movement = movement;
        self
    }

    pub fn requires_target(mut self) -> Self {
        self.requires_target = true;
        self
    }

    pub fn interrupt_on_hit(mut self, to: BehaviorState) -> Self {
        self.interrupt_on_hit = Some(to);
        self
    }

    pub fn contact_damage(mut self, amount: i32) -> Self {
        self.contact_damage = Some(amount);
        self
    }

    fn references(&self) -> impl Iterator<Item = BehaviorState> + '_ {
        self.transitions
            .iter()
            .map(|transition| transition.to)
            .chain(self.resume)
            .chain(self.interrupt_on_hit)
    }
}

/// Transition table for one phase: `state → ordered (guard, next)` plus
/// per-state behavior.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionTable {
    pub initial: BehaviorState,
    /// Fallback when a required reference is missing.
    pub safe_state: BehaviorState,
    pub states: Vec<StateSpec>,
}

impl TransitionTable {
    pub fn new(initial: BehaviorState, safe_state: BehaviorState) -> Self {
        Self {
            initial,
            safe_state,
            states: Vec::new(),
        }
    }

    pub fn state(mut self, spec: StateSpec) -> Self {
        self.states.push(spec);
        self
    }

    pub fn get(&self, state: BehaviorState) -> Option<&StateSpec> {
        self.states.iter().find(|spec| spec.state == state)
    }

    /// Checks references and sequences. `Death` is always available.
    pub fn validate(&self, archetype: &str, phase: &str) -> Result<(), SpecError> {
        let mut seen = Vec::with_capacity(self.states.len());
        for spec in &self.states {
            if seen.contains(&spec.state) {
                return Err(SpecError::DuplicateState {
                    archetype: archetype.to_owned(),
                    phase: phase.to_owned(),
                    state: spec.state,
                });
            }
            seen.push(spec.state);
        }

        let referenced = [self.initial, self.safe_state]
            .into_iter()
            .chain(self.states.iter().flat_map(StateSpec::references));
        for state in referenced {
            if state != BehaviorState::Death && !seen.contains(&state) {
                return Err(SpecError::UnknownState {
                    archetype: archetype.to_owned(),
                    phase: phase.to_owned(),
                    state,
                });
            }
        }

        for spec in &self.states {
            if let Some(sequence) = &spec.sequence {
                sequence.validate(archetype)?;
            }
            let durations = spec.enter.iter().flat_map(Action::durations);
            for seconds in durations {
                if seconds < 0.0 {
                    return Err(SpecError::NegativeDuration {
                        archetype: archetype.to_owned(),
                        context: format!("{phase}/{}", spec.state),
                        seconds,
                    });
                }
            }
        }
        Ok(())
    }

    /// Validates and compiles, adding `death` if the table defines no Death state.
    pub fn compile(
        &self,
        archetype: &str,
        phase: &str,
        death: &StateSpec,
    ) -> Result<CompiledTable, SpecError> {
        self.validate(archetype, phase)?;

        let mut states = BTreeMap::new();
        let specs = self
            .states
            .iter()
            .chain((self.get(BehaviorState::Death).is_none()).then_some(death));
        for spec in specs {
            let program = match &spec.sequence {
                Some(sequence) => Some(sequence.compile(archetype)?),
                None => None,
            };
            states.insert(
                spec.state,
                CompiledState {
                    spec: spec.clone(),
                    program,
                },
            );
        }

        Ok(CompiledTable {
            initial: self.initial,
            safe_state: self.safe_state,
            states,
        })
    }
}

/// A state with its sequence compiled.
pub struct CompiledState {
    pub(crate) spec: StateSpec,
    pub(crate) program: Option<Arc<ActionSequence<AgentBody>>>,
}

impl CompiledState {
    pub fn spec(&self) -> &StateSpec {
        &self.spec
    }
}

/// An immutable, shareable transition table ready to drive machines.
pub struct CompiledTable {
    initial: BehaviorState,
    safe_state: BehaviorState,
    states: BTreeMap<BehaviorState, CompiledState>,
}

impl CompiledTable {
    pub fn initial(&self) -> BehaviorState {
        self.initial
    }

    pub fn safe_state(&self) -> BehaviorState {
        self.safe_state
    }

    pub fn get(&self, state: BehaviorState) -> Option<&CompiledState> {
        self.states.get(&state)
    }

    pub fn states(&self) -> impl Iterator<Item = BehaviorState> + '_ {
        self.states.keys().copied()
    }

    /// Every `TargetLostFor` range used by this table's guards.
    pub(crate) fn lost_ranges(&self) -> Vec<f32> {
        let mut ranges = Vec::new();
        for compiled in self.states.values() {
            for transition in &compiled.spec.transitions {
                transition.guard.lost_ranges(&mut ranges);
            }
        }
        ranges
    }
}

impl std::fmt::Debug for CompiledTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTable")
            .field("initial", &self.initial)
            .field("safe_state", &self.safe_state)
            .field("states", &self.states.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::StepSpec;

    fn death() -> StateSpec {
        StateSpec::new(BehaviorState::Death).on_enter(Action::Stop)
    }

    #[test]
    fn compile_adds_death_state() {
        let table = TransitionTable::new(BehaviorState::Patrol, BehaviorState::Patrol)
            .state(StateSpec::new(BehaviorState::Patrol));

        let compiled = table.compile("slime", "main", &death()).unwrap();
        let states: Vec<_> = compiled.states().collect();
        assert_eq!(states, vec![BehaviorState::Patrol, BehaviorState::Death]);
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let table = TransitionTable::new(BehaviorState::Patrol, BehaviorState::Patrol).state(
            StateSpec::new(BehaviorState::Patrol).to(Guard::within(5.0), BehaviorState::Chase),
        );

        let err = table.validate("slime", "main").unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownState {
                archetype: "slime".into(),
                phase: "main".into(),
                state: BehaviorState::Chase,
            }
        );
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let table = TransitionTable::new(BehaviorState::Idle, BehaviorState::Idle)
            .state(StateSpec::new(BehaviorState::Idle))
            .state(StateSpec::new(BehaviorState::Idle));

        assert!(matches!(
            table.validate("slime", "main"),
            Err(SpecError::DuplicateState { .. })
        ));
    }

    #[test]
    fn nested_sequence_errors_surface() {
        let table = TransitionTable::new(BehaviorState::Chase, BehaviorState::Chase)
            .state(StateSpec::new(BehaviorState::Chase))
            .state(StateSpec::new(BehaviorState::Melee).sequence(
                SequenceSpec::new("swing").then(StepSpec::seconds("windup", -0.5)),
                BehaviorState::Chase,
            ));

        assert!(matches!(
            table.validate("golem", "main"),
            Err(SpecError::NegativeDuration { .. })
        ));
    }
}
