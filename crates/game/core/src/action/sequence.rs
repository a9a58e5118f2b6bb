use std::sync::Arc;

use sequencer::{ActionSequence, Effect, SequenceBuilder, Step, Wait};

use super::Action;
use crate::body::AgentBody;
use crate::error::SpecError;

/// When a step is allowed to advance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WaitSpec {
    Seconds(f32),
    /// Horizontal distance to the target under `tolerance`, racing `timeout`.
    UntilNearTarget {
        tolerance: f32,
        timeout: Option<f32>,
    },
    /// Everything this agent spawned has been defeated.
    UntilSpawnsCleared { timeout: Option<f32> },
    /// The agent took damage this tick.
    UntilHit { timeout: Option<f32> },
    UntilGrounded { timeout: Option<f32> },
    /// Within `tolerance` of the destination chosen by a waypoint run.
    UntilArrived {
        tolerance: f32,
        timeout: Option<f32>,
    },
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self::Seconds(0.0)
    }
}

impl WaitSpec {
    pub fn compile(&self) -> Wait<AgentBody> {
        match *self {
            Self::Seconds(seconds) => Wait::seconds(seconds),
            Self::UntilNearTarget { tolerance, timeout } => bounded(timeout, move |body| {
                body.facts()
                    .target
                    .is_some_and(|target| target.horizontal_offset.abs() < tolerance)
            }),
            Self::UntilSpawnsCleared { timeout } => {
                bounded(timeout, |body| body.live_spawns() == 0)
            }
            Self::UntilHit { timeout } => bounded(timeout, AgentBody::was_hit),
            Self::UntilGrounded { timeout } => bounded(timeout, |body| body.facts().grounded),
            Self::UntilArrived { tolerance, timeout } => bounded(timeout, move |body| {
                match (body.destination(), body.facts().position) {
                    (Some(goal), Some(own)) => own.distance(goal) <= tolerance,
                    _ => true,
                }
            }),
        }
    }

    fn durations(&self) -> Vec<f32> {
        match *self {
            Self::Seconds(seconds) => vec![seconds],
            Self::UntilNearTarget { tolerance, timeout }
            | Self::UntilArrived { tolerance, timeout } => {
                let mut durations = vec![tolerance];
                durations.extend(timeout);
                durations
            }
            Self::UntilSpawnsCleared { timeout }
            | Self::UntilHit { timeout }
            | Self::UntilGrounded { timeout } => timeout.into_iter().collect(),
        }
    }
}

fn bounded(
    timeout: Option<f32>,
    predicate: impl Fn(&AgentBody) -> bool + Send + Sync + 'static,
) -> Wait<AgentBody> {
    match timeout {
        Some(timeout) => Wait::race(timeout, predicate),
        None => Wait::until(predicate),
    }
}

/// One step: enter actions, a wait, exit actions.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StepSpec {
    pub label: String,
    pub wait: WaitSpec,
    pub enter: Vec<Action>,
    pub exit: Vec<Action>,
}

impl StepSpec {
    pub fn new(label: impl Into<String>, wait: WaitSpec) -> Self {
        Self {
            label: label.into(),
            wait,
            enter: Vec::new(),
            exit: Vec::new(),
        }
    }

    pub fn seconds(label: impl Into<String>, seconds: f32) -> Self {
        Self::new(label, WaitSpec::Seconds(seconds))
    }

    /// A step that runs its actions and advances in the same tick.
    pub fn instant(label: impl Into<String>) -> Self {
        Self::new(label, WaitSpec::Seconds(0.0))
    }

    pub fn enter(mut self, action: Action) -> Self {
        self.enter.push(action);
        self
    }

    pub fn exit(mut self, action: Action) -> Self {
        self.exit.push(action);
        self
    }

    pub fn compile(&self) -> Step<AgentBody> {
        Step::new(self.label.clone(), self.wait.compile())
            .with_enter_effect(effect(&self.enter))
            .with_exit_effect(effect(&self.exit))
    }

    pub(crate) fn durations(&self) -> impl Iterator<Item = f32> + '_ {
        self.wait
            .durations()
            .into_iter()
            .chain(self.enter.iter().chain(&self.exit).flat_map(Action::durations))
    }
}

fn effect(actions: &[Action]) -> Option<Effect<AgentBody>> {
    if actions.is_empty() {
        return None;
    }
    let actions = actions.to_vec();
    Some(Box::new(move |body: &mut AgentBody| {
        for action in &actions {
            action.apply(body);
        }
    }))
}

/// How often the body of a sequence runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Repeat {
    #[default]
    Once,
    Times(u32),
    /// Loop the body until the sequence is cancelled.
    Forever,
}

/// A named attack program: `intro`, then `body` per [`Repeat`], then `outro`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SequenceSpec {
    pub name: String,
    pub intro: Vec<StepSpec>,
    pub body: Vec<StepSpec>,
    pub repeat: Repeat,
    pub outro: Vec<StepSpec>,
}

impl SequenceSpec {
    /// Upper bound on unrolled steps per sequence.
    pub const MAX_STEPS: usize = 4096;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn intro(mut self, step: StepSpec) -> Self {
        self.intro.push(step);
        self
    }

    /// Appends a body step.
    pub fn then(mut self, step: StepSpec) -> Self {
        self.body.push(step);
        self
    }

    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn outro(mut self, step: StepSpec) -> Self {
        self.outro.push(step);
        self
    }

    fn body_runs(&self) -> u64 {
        match self.repeat {
            Repeat::Once | Repeat::Forever => 1,
            Repeat::Times(times) => u64::from(times),
        }
    }

    /// Steps the compiled program will hold once `Repeat::Times` is unrolled.
    pub fn unrolled_len(&self) -> u64 {
        let edges = (self.intro.len() + self.outro.len()) as u64;
        (self.body.len() as u64)
            .saturating_mul(self.body_runs())
            .saturating_add(edges)
    }

    /// Checks that the sequence can be compiled.
    pub fn validate(&self, archetype: &str) -> Result<(), SpecError> {
        let steps = self.unrolled_len();
        if steps > Self::MAX_STEPS as u64 {
            return Err(SpecError::RepeatTooLarge {
                archetype: archetype.to_owned(),
                sequence: self.name.clone(),
                steps,
                limit: Self::MAX_STEPS,
            });
        }
        let loops_nothing = self.repeat == Repeat::Forever && self.body.is_empty();
        if steps == 0 || loops_nothing {
            return Err(SpecError::EmptySequence {
                archetype: archetype.to_owned(),
                sequence: self.name.clone(),
            });
        }
        if self.repeat == Repeat::Forever && !self.outro.is_empty() {
            return Err(SpecError::UnreachableOutro {
                archetype: archetype.to_owned(),
                sequence: self.name.clone(),
            });
        }

        let all_steps = self.intro.iter().chain(&self.body).chain(&self.outro);
        for step in all_steps {
            if let Some(seconds) = step.durations().find(|seconds| *seconds < 0.0) {
                return Err(SpecError::NegativeDuration {
                    archetype: archetype.to_owned(),
                    context: format!("{}/{}", self.name, step.label),
                    seconds,
                });
            }
        }
        Ok(())
    }

    /// Validates and compiles into a shareable program.
    pub fn compile(&self, archetype: &str) -> Result<Arc<ActionSequence<AgentBody>>, SpecError> {
        self.validate(archetype)?;

        let mut builder = SequenceBuilder::new(self.name.clone())
            .steps(self.intro.iter().map(StepSpec::compile));
        builder = match self.repeat {
            Repeat::Once => builder.steps(self.body.iter().map(StepSpec::compile)),
            Repeat::Times(times) => builder.repeat(times as usize, |builder| {
                builder.steps(self.body.iter().map(StepSpec::compile))
            }),
            Repeat::Forever => builder
                .loop_from_here()
                .steps(self.body.iter().map(StepSpec::compile)),
        };
        Ok(builder
            .steps(self.outro.iter().map(StepSpec::compile))
            .into_shared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec2;

    #[test]
    fn repeat_times_unrolls_body() {
        let spec = SequenceSpec::new("rampage")
            .intro(StepSpec::seconds("rage", 1.0))
            .then(StepSpec::seconds("jump", 0.5))
            .then(StepSpec::seconds("slam", 0.5).enter(Action::Impulse(Vec2::DOWN * 15.0)))
            .repeat(Repeat::Times(3))
            .outro(StepSpec::instant("done"));

        let program = spec.compile("slime_king").unwrap();
        assert_eq!(program.len(), 1 + 2 * 3 + 1);
        assert_eq!(program.loop_from(), None);
    }

    #[test]
    fn forever_loops_back_to_body() {
        let spec = SequenceSpec::new("volley")
            .intro(StepSpec::seconds("slam", 0.5))
            .then(StepSpec::seconds("fire", 1.5).enter(Action::spawn("bullet", 1)))
            .repeat(Repeat::Forever);

        let program = spec.compile("golem").unwrap();
        assert_eq!(program.loop_from(), Some(1));
    }

    #[test]
    fn invalid_sequences_are_rejected() {
        let empty = SequenceSpec::new("nothing").repeat(Repeat::Times(0));
        assert!(matches!(
            empty.compile("x"),
            Err(SpecError::EmptySequence { .. })
        ));

        let outro = SequenceSpec::new("loop")
            .then(StepSpec::seconds("a", 1.0))
            .repeat(Repeat::Forever)
            .outro(StepSpec::instant("never"));
        assert!(matches!(
            outro.validate("x"),
            Err(SpecError::UnreachableOutro { .. })
        ));

        let huge = SequenceSpec::new("endless")
            .then(StepSpec::seconds("jump", 0.5))
            .then(StepSpec::seconds("slam", 0.5))
            .repeat(Repeat::Times(u32::MAX));
        assert!(matches!(
            huge.compile("x"),
            Err(SpecError::RepeatTooLarge { steps, limit, .. })
                if steps == 2 * u64::from(u32::MAX) && limit == SequenceSpec::MAX_STEPS
        ));

        let negative = SequenceSpec::new("bad").then(StepSpec::seconds("wait", -1.0));
        assert!(matches!(
            negative.validate("x"),
            Err(SpecError::NegativeDuration { seconds, .. }) if seconds == -1.0
        ));
    }
}
