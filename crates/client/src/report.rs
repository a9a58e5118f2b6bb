//! Human-readable event lines and the end-of-run summary.
use std::fmt;

use serde::Serialize;

use game_core::{AgentEvent, AgentId, AgentSnapshot, BehaviorState};
use runtime::Event;

/// Renders one event as a log line.
pub fn format_event(event: &Event, seconds: f32) -> String {
    let body = match &event.payload {
        AgentEvent::StateChanged { from, to, .. } => format!("state {from} -> {to}"),
        AgentEvent::SequenceStarted { handle, name, .. } => {
            format!("sequence `{name}` started (#{handle})")
        }
        AgentEvent::SequenceCompleted { handle, .. } => format!("sequence #{handle} completed"),
        AgentEvent::SequenceCancelled { handle, .. } => format!("sequence #{handle} cancelled"),
        AgentEvent::ThresholdCrossed { value, .. } => format!("threshold {value} crossed"),
        AgentEvent::PhaseChanged { from, to, name, .. } => {
            format!("phase {from} -> {to} `{name}` (locked)")
        }
        AgentEvent::PhaseEnabled { index, .. } => format!("phase {index} enabled"),
        AgentEvent::Damaged { amount, health, .. } => {
            format!("took {amount} damage, health {health}")
        }
        AgentEvent::DamageIgnored { amount, .. } => format!("ignored {amount} damage"),
        AgentEvent::DamageDealt { target, amount, .. } => {
            format!("dealt {amount} damage to {target}")
        }
        AgentEvent::Healed { health, .. } => format!("healed to {health}"),
        AgentEvent::Spawned { prefab, entity, .. } => format!("summoned {prefab} as {entity}"),
        AgentEvent::Died { .. } => "died".to_owned(),
        AgentEvent::Despawned { .. } => "despawned".to_owned(),
    };
    format!("[{seconds:>7.2}s] {:<4} {body}", event.agent().to_string())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub archetype: String,
    pub agent: AgentId,
    pub max_health: i32,
    pub ticks: u64,
    pub seconds: f32,
    pub events: usize,
    pub thresholds: Vec<i32>,
    pub phases: Vec<String>,
    pub states_visited: Vec<BehaviorState>,
    pub hits_landed: usize,
    pub hits_ignored: usize,
    pub damage_to_target: i32,
    pub summons: usize,
    pub died_at: Option<f32>,
    pub despawned_at: Option<f32>,
    pub final_state: Option<BehaviorState>,
    pub final_phase: Option<usize>,
    pub final_health: Option<i32>,
}

impl Summary {
    pub fn new(archetype: impl Into<String>, agent: AgentId, max_health: i32) -> Self {
        Self {
            archetype: archetype.into(),
            agent,
            max_health,
            ticks: 0,
            seconds: 0.0,
            events: 0,
            thresholds: Vec::new(),
            phases: Vec::new(),
            states_visited: Vec::new(),
            hits_landed: 0,
            hits_ignored: 0,
            damage_to_target: 0,
            summons: 0,
            died_at: None,
            despawned_at: None,
            final_state: None,
            final_phase: None,
            final_health: None,
        }
    }

    pub fn record(&mut self, event: &Event, seconds: f32) {
        self.events += 1;
        match &event.payload {
            AgentEvent::StateChanged { to, .. } => {
                if !self.states_visited.contains(to) {
                    self.states_visited.push(*to);
                }
            }
            AgentEvent::ThresholdCrossed { value, .. } => self.thresholds.push(*value),
            AgentEvent::PhaseChanged { name, .. } => self.phases.push(name.clone()),
            AgentEvent::Damaged { .. } => self.hits_landed += 1,
            AgentEvent::DamageIgnored { .. } => self.hits_ignored += 1,
            AgentEvent::DamageDealt { target, amount, .. } if target.is_player() => {
                self.damage_to_target += amount;
            }
            AgentEvent::Spawned { .. } => self.summons += 1,
            AgentEvent::Died { .. } => self.died_at = Some(seconds),
            AgentEvent::Despawned { .. } => self.despawned_at = Some(seconds),
            _ => {}
        }
    }

    /// Stamps the run length and, unless it despawned, the agent's final view.
    pub fn finish(&mut self, ticks: u64, seconds: f32, last: Option<&AgentSnapshot>) {
        self.ticks = ticks;
        self.seconds = seconds;
        if let Some(snapshot) = last {
            self.final_state = Some(snapshot.state);
            self.final_phase = Some(snapshot.phase);
            self.final_health = Some(snapshot.health.current());
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ({}) ==", self.archetype, self.agent)?;
        writeln!(f, "simulated   {} ticks, {:.2}s", self.ticks, self.seconds)?;
        writeln!(f, "events      {}", self.events)?;
        writeln!(f, "thresholds  {}", join(&self.thresholds))?;
        if !self.phases.is_empty() {
            writeln!(f, "phases      {}", self.phases.join(", "))?;
        }
        writeln!(f, "states      {}", join(&self.states_visited))?;
        writeln!(
            f,
            "hits        {} landed, {} ignored",
            self.hits_landed, self.hits_ignored
        )?;
        writeln!(f, "dealt       {} damage to the target", self.damage_to_target)?;
        if self.summons > 0 {
            writeln!(f, "summons     {}", self.summons)?;
        }
        if let Some(at) = self.died_at {
            writeln!(f, "died        at {at:.2}s")?;
        }
        match (self.despawned_at, self.final_state) {
            (Some(at), _) => write!(f, "despawned   at {at:.2}s"),
            (None, Some(state)) => write!(
                f,
                "final       {state}, phase {}, health {}/{}",
                self.final_phase.unwrap_or_default(),
                self.final_health.unwrap_or_default(),
                self.max_health
            ),
            (None, None) => write!(f, "final       unknown"),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_owned();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(payload: AgentEvent) -> Event {
        Event::new(1, payload)
    }

    #[test]
    fn event_lines_name_the_agent() {
        let line = format_event(
            &event(AgentEvent::ThresholdCrossed {
                agent: AgentId(1),
                value: 400,
            }),
            1.0,
        );
        assert!(line.contains("threshold 400 crossed"), "{line}");
        assert!(line.contains("1.00s"), "{line}");
    }

    #[test]
    fn summary_tallies_combat() {
        let agent = AgentId(1);
        let mut summary = Summary::new("slime", agent, 100);
        summary.record(
            &event(AgentEvent::Damaged {
                agent,
                amount: 30,
                health: 70,
            }),
            0.5,
        );
        summary.record(&event(AgentEvent::DamageIgnored { agent, amount: 5 }), 0.6);
        summary.record(
            &event(AgentEvent::DamageDealt {
                agent,
                target: AgentId::PLAYER,
                amount: 25,
            }),
            0.7,
        );
        summary.record(&event(AgentEvent::Died { agent }), 0.8);
        summary.finish(50, 1.0, None);

        assert_eq!((summary.hits_landed, summary.hits_ignored), (1, 1));
        assert_eq!(summary.damage_to_target, 25);
        assert_eq!(summary.died_at, Some(0.8));
        let text = summary.to_string();
        assert!(text.contains("1 landed, 1 ignored"), "{text}");
        assert!(text.contains("final       unknown"), "{text}");
    }
}
