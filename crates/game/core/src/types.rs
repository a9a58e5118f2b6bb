//! Identity, geometry and health primitives shared by every agent.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use bitflags::bitflags;

/// Unique identifier for any agent tracked by a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentId(pub u32);

impl AgentId {
    /// Reserved identifier for the player, the default target of every agent.
    pub const PLAYER: Self = Self(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns true if this agent represents the player.
    #[inline]
    pub const fn is_player(self) -> bool {
        self.0 == Self::PLAYER.0
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::PLAYER
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Continuous 2D vector in world units.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    pub const DOWN: Self = Self { x: 0.0, y: -1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Self {
        let length = self.length();
        if length <= f32::EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / length)
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Integer health meter. `current` is kept within `0..=maximum`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Health {
    current: i32,
    maximum: i32,
}

impl Health {
    /// Full health meter. A non-positive maximum is raised to 1.
    pub fn new(maximum: i32) -> Self {
        let maximum = maximum.max(1);
        Self {
            current: maximum,
            maximum,
        }
    }

    #[inline]
    pub const fn current(&self) -> i32 {
        self.current
    }

    #[inline]
    pub const fn maximum(&self) -> i32 {
        self.maximum
    }

    /// Overwrites the current value, clamped to the meter.
    pub fn set(&mut self, value: i32) {
        self.current = value.clamp(0, self.maximum);
    }

    pub fn restore(&mut self) {
        self.current = self.maximum;
    }

    #[inline]
    pub const fn is_depleted(&self) -> bool {
        self.current <= 0
    }

    pub fn ratio(&self) -> f32 {
        self.current as f32 / self.maximum as f32
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.maximum)
    }
}

/// Behavior states observed across every archetype.
///
/// Regular creatures cycle through `Patrol → Idle → Chase → attack`; bosses
/// add `Rampage`, `SummonPhase` and `BulletHell` super-states that preempt the
/// normal cycle. `Death` is terminal.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BehaviorState {
    #[default]
    Patrol,
    Idle,
    /// Short alert beat between noticing the target and chasing it.
    Detect,
    Chase,
    Melee,
    RangedAttack,
    SpecialAttack,
    Dash,
    Block,
    Rampage,
    SummonPhase,
    BulletHell,
    Death,
}

impl BehaviorState {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Death)
    }

    /// States entered to hit the target; they complete through their sequence.
    pub const fn is_attack(self) -> bool {
        matches!(
            self,
            Self::Melee | Self::RangedAttack | Self::SpecialAttack | Self::Dash
        )
    }

    /// Boss-only super-states that preempt the regular cycle.
    pub const fn is_special(self) -> bool {
        matches!(self, Self::Rampage | Self::SummonPhase | Self::BulletHell)
    }
}

bitflags! {
    /// Transient conditions toggled by sequence steps.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct AgentFlags: u8 {
        /// Hit-immunity layer: incoming damage is ignored.
        const UNTOUCHABLE = 1 << 0;
        /// Guarding: incoming damage is ignored.
        const BLOCKING    = 1 << 1;
        /// A summon ritual is in progress.
        const SUMMONING   = 1 << 2;
        /// Visually vanished (teleport windups).
        const HIDDEN      = 1 << 3;
    }
}

impl AgentFlags {
    /// Returns true if damage reports must be ignored.
    #[inline]
    pub const fn ignores_damage(self) -> bool {
        self.intersects(Self::UNTOUCHABLE.union(Self::BLOCKING))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn health_is_clamped_to_meter() {
        let mut health = Health::new(500);
        health.set(-40);
        assert_eq!(health.current(), 0);
        assert!(health.is_depleted());

        health.set(900);
        assert_eq!(health.current(), 500);
    }

    #[test]
    fn behavior_state_parses_snake_case() {
        assert_eq!(
            BehaviorState::from_str("bullet_hell").unwrap(),
            BehaviorState::BulletHell
        );
        assert_eq!(BehaviorState::SummonPhase.to_string(), "summon_phase");
        assert!(BehaviorState::Death.is_terminal());
    }

    #[test]
    fn blocking_and_untouchable_ignore_damage() {
        assert!(AgentFlags::BLOCKING.ignores_damage());
        assert!((AgentFlags::UNTOUCHABLE | AgentFlags::HIDDEN).ignores_damage());
        assert!(!AgentFlags::SUMMONING.ignores_damage());
    }

    #[test]
    fn normalizing_zero_stays_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        let unit = Vec2::new(3.0, 4.0).normalized();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }
}
