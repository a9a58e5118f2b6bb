//! The agent blackboard that sequence effects, guards and movement act on.
use std::collections::{BTreeMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sequencer::{SequenceHandle, TIME_EPSILON};
use tracing::{debug, warn};

use crate::error::{EngineError, Reference};
use crate::events::AgentEvent;
use crate::facts::Facts;
use crate::ports::Ports;
use crate::types::{AgentFlags, AgentId, BehaviorState, Health, Vec2};

/// A state change asked for by an effect, settled after the effect returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StateRequest {
    pub state: BehaviorState,
    /// Raised by the running sequence itself, which must therefore survive.
    pub continuation: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SelfDestruct {
    Armed,
    Pending,
    Spent,
}

#[derive(Clone, Copy, Debug)]
struct LostTimer {
    range: f32,
    elapsed: f32,
}

#[derive(Clone, Debug, Default)]
struct PatrolRoute {
    points: Vec<Vec2>,
    tolerance: f32,
    cursor: usize,
}

/// Everything an agent owns besides its machines, sequencer and thresholds.
///
/// This is the context type every compiled sequence runs against. Effects
/// never call back into the state machine directly; they leave a
/// [`StateRequest`] which the agent settles once the sequencer returns.
pub struct AgentBody {
    id: AgentId,
    target: AgentId,
    ports: Ports,
    facts: Facts,
    health: Health,
    flags: AgentFlags,
    velocity: Vec2,
    cooldowns: BTreeMap<String, f32>,
    idle_remaining: Option<f32>,
    state_elapsed: f32,
    lost_timers: Vec<LostTimer>,
    patrol: PatrolRoute,
    waypoints: Vec<Vec2>,
    destination: Option<Vec2>,
    hit: bool,
    driving: bool,
    request: Option<StateRequest>,
    self_destruct: SelfDestruct,
    finished: VecDeque<SequenceHandle>,
    outbox: Vec<AgentEvent>,
    rng: StdRng,
}

impl AgentBody {
    pub fn new(id: AgentId, target: AgentId, max_health: i32, ports: Ports, seed: u64) -> Self {
        Self {
            id,
            target,
            ports,
            facts: Facts::default(),
            health: Health::new(max_health),
            flags: AgentFlags::empty(),
            velocity: Vec2::ZERO,
            cooldowns: BTreeMap::new(),
            idle_remaining: None,
            state_elapsed: 0.0,
            lost_timers: Vec::new(),
            patrol: PatrolRoute::default(),
            waypoints: Vec::new(),
            destination: None,
            hit: false,
            driving: false,
            request: None,
            self_destruct: SelfDestruct::Armed,
            finished: VecDeque::new(),
            outbox: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn with_patrol(mut self, points: Vec<Vec2>, tolerance: f32) -> Self {
        self.patrol = PatrolRoute {
            points,
            tolerance,
            cursor: 0,
        };
        self
    }

    pub(crate) fn with_waypoints(mut self, waypoints: Vec<Vec2>) -> Self {
        self.waypoints = waypoints;
        self
    }

    /// Starts tracking how long the target has been beyond `range`.
    pub(crate) fn track_lost_range(&mut self, range: f32) {
        if !self.lost_timers.iter().any(|timer| timer.range == range) {
            self.lost_timers.push(LostTimer {
                range,
                elapsed: 0.0,
            });
        }
    }

    // ===== read access =====

    #[inline]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[inline]
    pub fn target(&self) -> AgentId {
        self.target
    }

    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    pub fn facts(&self) -> &Facts {
        &self.facts
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn flags(&self) -> AgentFlags {
        self.flags
    }

    /// Last velocity intent sent to the motion actuator.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Seconds spent in the current state.
    pub fn state_elapsed(&self) -> f32 {
        self.state_elapsed
    }

    pub fn cooldown_ready(&self, name: &str) -> bool {
        self.cooldowns
            .get(name)
            .is_none_or(|remaining| *remaining <= TIME_EPSILON)
    }

    /// `true` once a rolled idle interval has run out.
    pub fn idle_interval_elapsed(&self) -> bool {
        self.idle_remaining
            .is_some_and(|remaining| remaining <= TIME_EPSILON)
    }

    /// Seconds the target has continuously been beyond `range` (or missing).
    pub fn lost_for(&self, range: f32) -> f32 {
        self.lost_timers
            .iter()
            .find(|timer| timer.range == range)
            .map_or(0.0, |timer| timer.elapsed)
    }

    /// `true` if the agent took damage during the current tick.
    pub fn was_hit(&self) -> bool {
        self.hit
    }

    /// Current travel destination set by a waypoint run.
    pub fn destination(&self) -> Option<Vec2> {
        self.destination
    }

    pub fn live_spawns(&self) -> usize {
        self.ports.spawner.live_spawns(self.id)
    }

    // ===== side effects =====

    pub fn emit(&mut self, event: AgentEvent) {
        self.outbox.push(event);
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
        self.ports.motion.set_velocity_intent(self.id, velocity);
    }

    pub fn stop(&mut self) {
        self.set_velocity(Vec2::ZERO);
    }

    pub fn apply_impulse(&mut self, impulse: Vec2) {
        self.ports.motion.apply_impulse(self.id, impulse);
    }

    pub fn teleport(&mut self, position: Vec2) {
        self.ports.motion.teleport(self.id, position);
    }

    /// Turns toward the target. Returns `false` when there is none.
    pub fn face_target(&mut self) -> bool {
        match self.facts.target {
            Some(target) => {
                self.ports
                    .motion
                    .set_facing(self.id, target.horizontal_offset >= 0.0);
                true
            }
            None => false,
        }
    }

    pub fn insert_flags(&mut self, flags: AgentFlags) {
        self.flags.insert(flags);
    }

    pub fn remove_flags(&mut self, flags: AgentFlags) {
        self.flags.remove(flags);
    }

    pub fn start_cooldown(&mut self, name: &str, seconds: f32) {
        self.cooldowns.insert(name.to_owned(), seconds.max(0.0));
    }

    /// Rolls a fresh idle countdown in `[min, max)`.
    pub fn roll_idle_interval(&mut self, min: f32, max: f32) {
        let seconds = if max <= min {
            min
        } else {
            self.rng.gen_range(min..max)
        };
        self.idle_remaining = Some(seconds.max(0.0));
    }

    /// Asks for a state change once the current effect has returned.
    ///
    /// Only one request is held between settles; the first one wins.
    pub fn request_state(&mut self, state: BehaviorState) {
        if let Some(pending) = self.request {
            debug!(
                target: "game_core::body",
                agent = %self.id,
                pending = %pending.state,
                dropped = %state,
                "state request dropped"
            );
            return;
        }
        self.request = Some(StateRequest {
            state,
            continuation: self.driving,
        });
    }

    /// Asks the agent to report zero health once the current effect has
    /// returned. Only the first call counts.
    pub fn self_destruct(&mut self) {
        if self.self_destruct == SelfDestruct::Armed {
            self.self_destruct = SelfDestruct::Pending;
        }
    }

    /// True once the agent has destroyed itself; its death sequence is skipped.
    pub fn self_destructed(&self) -> bool {
        self.self_destruct != SelfDestruct::Armed
    }

    pub fn restore_health(&mut self) -> i32 {
        self.health.restore();
        self.health.current()
    }

    /// Picks the waypoint farthest from the agent as the travel destination.
    pub fn choose_farthest_waypoint(&mut self) -> Option<Vec2> {
        let own = self.facts.position?;
        let farthest = self.waypoints.iter().copied().max_by(|a, b| {
            own.distance(*a)
                .partial_cmp(&own.distance(*b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        self.destination = Some(farthest);
        Some(farthest)
    }

    /// Logs a missing collaborator. The caller degrades on its own.
    pub fn report_missing(&self, reference: Reference) {
        let error = EngineError::MissingReference {
            agent: self.id,
            reference,
        };
        warn!(target: "game_core::agent", agent = %self.id, %error, "missing reference");
    }

    /// Moves along the patrol route at `speed`, advancing points on arrival.
    pub(crate) fn patrol(&mut self, speed: f32) {
        if self.patrol.points.is_empty() {
            self.stop();
            return;
        }
        let Some(own) = self.facts.position else {
            self.report_missing(Reference::Position);
            self.stop();
            return;
        };

        let mut goal = self.patrol.points[self.patrol.cursor];
        if (goal.x - own.x).abs() <= self.patrol.tolerance {
            self.patrol.cursor = (self.patrol.cursor + 1) % self.patrol.points.len();
            goal = self.patrol.points[self.patrol.cursor];
        }

        let direction = (goal.x - own.x).signum();
        self.ports.motion.set_facing(self.id, direction >= 0.0);
        self.set_velocity(Vec2::new(direction * speed, 0.0));
    }

    /// Flies along the patrol route in both axes.
    pub(crate) fn fly_patrol(&mut self, speed: f32) {
        if self.patrol.points.is_empty() {
            self.stop();
            return;
        }
        let Some(own) = self.facts.position else {
            self.report_missing(Reference::Position);
            self.stop();
            return;
        };

        let mut goal = self.patrol.points[self.patrol.cursor];
        if own.distance(goal) <= self.patrol.tolerance {
            self.patrol.cursor = (self.patrol.cursor + 1) % self.patrol.points.len();
            goal = self.patrol.points[self.patrol.cursor];
        }
        self.fly_toward(own, goal, speed);
    }

    /// Flies straight at the target.
    pub(crate) fn fly_pursue(&mut self, speed: f32) {
        match (self.facts.position, self.facts.target) {
            (Some(own), Some(target)) => self.fly_toward(own, target.position, speed),
            _ => self.stop(),
        }
    }

    fn fly_toward(&mut self, own: Vec2, goal: Vec2, speed: f32) {
        let heading = (goal - own).normalized();
        self.ports.motion.set_facing(self.id, heading.x >= 0.0);
        self.set_velocity(heading * speed);
    }

    /// Runs horizontally toward the target at `speed`.
    pub(crate) fn pursue(&mut self, speed: f32) {
        match self.facts.target {
            Some(target) => {
                let direction = target.horizontal_offset.signum();
                self.ports.motion.set_facing(self.id, direction >= 0.0);
                self.set_velocity(Vec2::new(direction * speed, 0.0));
            }
            None => self.stop(),
        }
    }

    // ===== bookkeeping driven by the agent =====

    pub(crate) fn observe(&mut self, facts: Facts) {
        self.facts = facts;
    }

    pub(crate) fn set_health(&mut self, value: i32) {
        self.health.set(value);
    }

    pub(crate) fn mark_hit(&mut self) {
        self.hit = true;
    }

    pub(crate) fn set_driving(&mut self, driving: bool) {
        self.driving = driving;
    }

    pub(crate) fn advance_clocks(&mut self, dt: f32) {
        self.state_elapsed += dt;
        if let Some(remaining) = self.idle_remaining.as_mut() {
            *remaining = (*remaining - dt).max(0.0);
        }
        for remaining in self.cooldowns.values_mut() {
            *remaining -= dt;
        }
        self.cooldowns.retain(|_, remaining| *remaining > TIME_EPSILON);

        let target = self.facts.target;
        for timer in &mut self.lost_timers {
            let beyond = target.is_none_or(|target| target.distance > timer.range);
            timer.elapsed = if beyond { timer.elapsed + dt } else { 0.0 };
        }
    }

    /// Clears per-state clocks on every state change.
    pub(crate) fn reset_state_clock(&mut self) {
        self.state_elapsed = 0.0;
        self.destination = None;
        for timer in &mut self.lost_timers {
            timer.elapsed = 0.0;
        }
    }

    pub(crate) fn end_tick(&mut self) {
        self.hit = false;
    }

    pub(crate) fn take_request(&mut self) -> Option<StateRequest> {
        self.request.take()
    }

    pub(crate) fn take_self_destruct(&mut self) -> bool {
        if self.self_destruct == SelfDestruct::Pending {
            self.self_destruct = SelfDestruct::Spent;
            return true;
        }
        false
    }

    pub(crate) fn push_finished(&mut self, handle: SequenceHandle) {
        self.finished.push_back(handle);
    }

    pub(crate) fn take_finished(&mut self) -> Option<SequenceHandle> {
        self.finished.pop_front()
    }

    pub(crate) fn drain_events(&mut self) -> Vec<AgentEvent> {
        std::mem::take(&mut self.outbox)
    }
}

impl std::fmt::Debug for AgentBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentBody")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("health", &self.health)
            .field("flags", &self.flags)
            .field("velocity", &self.velocity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> AgentBody {
        AgentBody::new(AgentId(1), AgentId::PLAYER, 100, Ports::detached(), 7)
    }

    #[test]
    fn cooldowns_expire_after_their_duration() {
        let mut body = body();
        body.start_cooldown("attack", 1.0);
        assert!(!body.cooldown_ready("attack"));

        for _ in 0..3 {
            body.advance_clocks(0.25);
        }
        assert!(!body.cooldown_ready("attack"));
        body.advance_clocks(0.25);
        assert!(body.cooldown_ready("attack"));
    }

    #[test]
    fn idle_interval_is_rolled_within_range() {
        let mut body = body();
        assert!(!body.idle_interval_elapsed());

        body.roll_idle_interval(3.0, 6.0);
        let rolled = body.idle_remaining.unwrap();
        assert!((3.0..6.0).contains(&rolled));

        body.roll_idle_interval(2.0, 2.0);
        assert_eq!(body.idle_remaining, Some(2.0));
        for _ in 0..8 {
            body.advance_clocks(0.25);
        }
        assert!(body.idle_interval_elapsed());
    }

    #[test]
    fn lost_timer_resets_while_target_in_range() {
        let mut body = body();
        body.track_lost_range(5.0);

        body.observe(Facts::at(Vec2::ZERO).with_target(AgentId::PLAYER, Vec2::new(8.0, 0.0)));
        body.advance_clocks(0.5);
        body.advance_clocks(0.5);
        assert_eq!(body.lost_for(5.0), 1.0);

        body.observe(Facts::at(Vec2::ZERO).with_target(AgentId::PLAYER, Vec2::new(3.0, 0.0)));
        body.advance_clocks(0.5);
        assert_eq!(body.lost_for(5.0), 0.0);
    }

    #[test]
    fn requests_made_while_driving_are_continuations() {
        let mut body = body();
        body.request_state(BehaviorState::Chase);
        assert!(!body.take_request().unwrap().continuation);

        body.set_driving(true);
        body.request_state(BehaviorState::Rampage);
        assert!(body.take_request().unwrap().continuation);
    }

    #[test]
    fn self_destruct_is_taken_once() {
        let mut body = body();
        assert!(!body.take_self_destruct());

        body.self_destruct();
        body.self_destruct();
        assert!(body.self_destructed());
        assert!(body.take_self_destruct());
        assert!(!body.take_self_destruct());

        body.self_destruct();
        assert!(!body.take_self_destruct());
    }

    #[test]
    fn flyers_head_straight_for_the_target() {
        let mut body = body();
        body.observe(Facts::at(Vec2::ZERO).with_target(AgentId::PLAYER, Vec2::new(3.0, 4.0)));
        body.fly_pursue(5.0);
        let velocity = body.velocity();
        assert!((velocity.x - 3.0).abs() < 1e-5, "{velocity:?}");
        assert!((velocity.y - 4.0).abs() < 1e-5, "{velocity:?}");
    }

    #[test]
    fn first_request_between_settles_wins() {
        let mut body = body();
        body.request_state(BehaviorState::Block);
        body.request_state(BehaviorState::Chase);

        let request = body.take_request().unwrap();
        assert_eq!(request.state, BehaviorState::Block);
        assert!(body.take_request().is_none());

        body.request_state(BehaviorState::Chase);
        assert_eq!(body.take_request().unwrap().state, BehaviorState::Chase);
    }
}
