//! Data-driven agent archetypes.
//!
//! An archetype is composition, not inheritance: phase transition tables,
//! health thresholds with their reactions, a patrol route and waypoints.
//! [`ArchetypeSpec`] is the serializable description; [`Archetype`] is the
//! validated, compiled form that agents are spawned from.
use std::sync::Arc;

use sequencer::ActionSequence;

use crate::action::{Action, SequenceSpec};
use crate::body::AgentBody;
use crate::error::SpecError;
use crate::machine::{CompiledTable, StateSpec, TransitionTable};
use crate::phase::{Reaction, SpecialTrigger};
use crate::types::{BehaviorState, Vec2};

/// An archetype-wide threshold, subscribed for the agent's whole life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThresholdSpec {
    pub at: i32,
    pub reaction: Reaction,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PatrolSpec {
    pub points: Vec<Vec2>,
    /// Horizontal distance at which a patrol point counts as reached.
    pub tolerance: f32,
}

impl Default for PatrolSpec {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            tolerance: 0.25,
        }
    }
}

/// How the terminal state plays out.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeathSpec {
    pub enter: Vec<Action>,
    pub sequence: Option<SequenceSpec>,
    /// Seconds between death and despawn.
    pub linger: f32,
}

impl DeathSpec {
    pub const DEFAULT_LINGER: f32 = 1.5;

    fn state(&self) -> StateSpec {
        StateSpec {
            state: BehaviorState::Death,
            enter: self.enter.clone(),
            sequence: self.sequence.clone(),
            ..StateSpec::default()
        }
    }
}

impl Default for DeathSpec {
    fn default() -> Self {
        Self {
            enter: vec![Action::Stop, Action::trigger("Death")],
            sequence: None,
            linger: Self::DEFAULT_LINGER,
        }
    }
}

/// One phase of an archetype.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhaseSpec {
    pub name: String,
    pub table: TransitionTable,
    /// Thresholds this phase listens to only while enabled.
    pub specials: Vec<SpecialTrigger>,
    /// Lock sequence run before the phase is enabled.
    pub intro: Option<SequenceSpec>,
}

impl PhaseSpec {
    pub fn new(name: impl Into<String>, table: TransitionTable) -> Self {
        Self {
            name: name.into(),
            table,
            ..Self::default()
        }
    }

    pub fn special(mut self, at: i32, state: BehaviorState) -> Self {
        self.specials.push(SpecialTrigger { at, state });
        self
    }

    pub fn intro(mut self, intro: SequenceSpec) -> Self {
        self.intro = Some(intro);
        self
    }
}

/// Serializable description of an agent kind.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArchetypeSpec {
    pub name: String,
    pub max_health: i32,
    pub phases: Vec<PhaseSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub thresholds: Vec<ThresholdSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub patrol: PatrolSpec,
    #[cfg_attr(feature = "serde", serde(default))]
    pub waypoints: Vec<Vec2>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub death: DeathSpec,
}

impl ArchetypeSpec {
    pub fn new(name: impl Into<String>, max_health: i32) -> Self {
        Self {
            name: name.into(),
            max_health,
            phases: Vec::new(),
            thresholds: Vec::new(),
            patrol: PatrolSpec::default(),
            waypoints: Vec::new(),
            death: DeathSpec::default(),
        }
    }

    pub fn phase(mut self, phase: PhaseSpec) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn threshold(mut self, at: i32, reaction: Reaction) -> Self {
        self.thresholds.push(ThresholdSpec { at, reaction });
        self
    }

    pub fn patrol(mut self, points: Vec<Vec2>, tolerance: f32) -> Self {
        self.patrol = PatrolSpec { points, tolerance };
        self
    }

    pub fn waypoints(mut self, waypoints: Vec<Vec2>) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn death(mut self, death: DeathSpec) -> Self {
        self.death = death;
        self
    }

    /// Checks every reference, sequence and duration.
    pub fn validate(&self) -> Result<(), SpecError> {
        let archetype = self.name.as_str();
        if self.max_health <= 0 {
            return Err(SpecError::InvalidHealth {
                archetype: archetype.to_owned(),
                maximum: self.max_health,
            });
        }
        if self.phases.is_empty() {
            return Err(SpecError::NoPhases {
                archetype: archetype.to_owned(),
            });
        }

        for phase in &self.phases {
            phase.table.validate(archetype, &phase.name)?;
            for special in &phase.specials {
                require_state(archetype, phase, special.state)?;
            }
            if let Some(intro) = &phase.intro {
                intro.validate(archetype)?;
            }
        }

        for threshold in &self.thresholds {
            match threshold.reaction {
                Reaction::AdvancePhase(index) if index >= self.phases.len() => {
                    return Err(SpecError::UnknownPhase {
                        archetype: archetype.to_owned(),
                        value: threshold.at,
                        index,
                    });
                }
                Reaction::Special(state) => {
                    for phase in &self.phases {
                        require_state(archetype, phase, state)?;
                    }
                }
                _ => {}
            }
        }

        if let Some(sequence) = &self.death.sequence {
            sequence.validate(archetype)?;
        }
        if self.death.linger < 0.0 {
            return Err(SpecError::NegativeDuration {
                archetype: archetype.to_owned(),
                context: "death linger".to_owned(),
                seconds: self.death.linger,
            });
        }
        Ok(())
    }

    pub fn compile(self) -> Result<Archetype, SpecError> {
        Archetype::compile(self)
    }
}

fn require_state(archetype: &str, phase: &PhaseSpec, state: BehaviorState) -> Result<(), SpecError> {
    if state == BehaviorState::Death || phase.table.get(state).is_some() {
        Ok(())
    } else {
        Err(SpecError::UnknownState {
            archetype: archetype.to_owned(),
            phase: phase.name.clone(),
            state,
        })
    }
}

pub(crate) struct CompiledPhase {
    pub(crate) name: String,
    pub(crate) table: Arc<CompiledTable>,
    pub(crate) specials: Vec<SpecialTrigger>,
    pub(crate) intro: Option<Arc<ActionSequence<AgentBody>>>,
}

/// A validated archetype with every table and sequence compiled.
///
/// Compiled programs are shared by all agents spawned from it.
pub struct Archetype {
    spec: ArchetypeSpec,
    pub(crate) phases: Vec<CompiledPhase>,
    pub(crate) lost_ranges: Vec<f32>,
}

impl Archetype {
    pub fn compile(spec: ArchetypeSpec) -> Result<Self, SpecError> {
        spec.validate()?;

        let death = spec.death.state();
        let mut phases = Vec::with_capacity(spec.phases.len());
        let mut lost_ranges = Vec::new();
        for phase in &spec.phases {
            let table = phase.table.compile(&spec.name, &phase.name, &death)?;
            lost_ranges.extend(table.lost_ranges());
            let intro = match &phase.intro {
                Some(intro) => Some(intro.compile(&spec.name)?),
                None => None,
            };
            phases.push(CompiledPhase {
                name: phase.name.clone(),
                table: Arc::new(table),
                specials: phase.specials.clone(),
                intro,
            });
        }

        Ok(Self {
            spec,
            phases,
            lost_ranges,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn max_health(&self) -> i32 {
        self.spec.max_health
    }

    pub fn spec(&self) -> &ArchetypeSpec {
        &self.spec
    }

    pub fn phase_names(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(|phase| phase.name.as_str())
    }

    pub fn death_linger(&self) -> f32 {
        self.spec.death.linger
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype")
            .field("name", &self.spec.name)
            .field("max_health", &self.spec.max_health)
            .field("phases", &self.phases.len())
            .finish()
    }
}
