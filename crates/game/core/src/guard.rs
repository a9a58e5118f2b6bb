//! Pure transition predicates over an agent's observable facts.
use crate::body::AgentBody;

/// A transition guard. Evaluation never mutates the agent.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Guard {
    Always,
    /// Target visible and at most this far away.
    TargetWithin(f32),
    /// Target missing or farther than this.
    TargetBeyond(f32),
    /// Target missing or beyond `range` continuously for `seconds`.
    TargetLostFor { range: f32, seconds: f32 },
    CooldownReady(String),
    /// At least this many seconds spent in the current state.
    StateTimerElapsed(f32),
    /// The rolled patrol idle countdown ran out.
    IdleIntervalElapsed,
    /// Current health strictly below the value.
    HealthBelow(i32),
    Grounded,
    All(Vec<Guard>),
    Any(Vec<Guard>),
    Not(Box<Guard>),
}

impl Guard {
    pub fn within(range: f32) -> Self {
        Self::TargetWithin(range)
    }

    pub fn cooldown(name: impl Into<String>) -> Self {
        Self::CooldownReady(name.into())
    }

    pub fn and(self, other: Guard) -> Self {
        match self {
            Self::All(mut guards) => {
                guards.push(other);
                Self::All(guards)
            }
            guard => Self::All(vec![guard, other]),
        }
    }

    pub fn negate(guard: Guard) -> Self {
        Self::Not(Box::new(guard))
    }

    pub fn evaluate(&self, body: &AgentBody) -> bool {
        let distance = body.facts().target_distance();
        match self {
            Self::Always => true,
            Self::TargetWithin(range) => distance.is_some_and(|distance| distance <= *range),
            Self::TargetBeyond(range) => distance.is_none_or(|distance| distance > *range),
            Self::TargetLostFor { range, seconds } => {
                body.lost_for(*range) + sequencer::TIME_EPSILON >= *seconds
            }
            Self::CooldownReady(name) => body.cooldown_ready(name),
            Self::StateTimerElapsed(seconds) => {
                body.state_elapsed() + sequencer::TIME_EPSILON >= *seconds
            }
            Self::IdleIntervalElapsed => body.idle_interval_elapsed(),
            Self::HealthBelow(value) => body.health().current() < *value,
            Self::Grounded => body.facts().grounded,
            Self::All(guards) => guards.iter().all(|guard| guard.evaluate(body)),
            Self::Any(guards) => guards.iter().any(|guard| guard.evaluate(body)),
            Self::Not(guard) => !guard.evaluate(body),
        }
    }

    /// Ranges of every `TargetLostFor` inside this guard.
    pub(crate) fn lost_ranges(&self, out: &mut Vec<f32>) {
        match self {
            Self::TargetLostFor { range, .. } => out.push(*range),
            Self::All(guards) | Self::Any(guards) => {
                for guard in guards {
                    guard.lost_ranges(out);
                }
            }
            Self::Not(guard) => guard.lost_ranges(out),
            _ => {}
        }
    }
}
