/// Engine-wide tunables shared by every agent in a world.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Fixed simulation rate. Every agent is ticked once per period.
    pub tick_rate_hz: u32,

    /// Upper bound on sequence steps one agent may advance within a single
    /// tick (also bounds chained state requests settled in that tick).
    pub max_step_advances_per_tick: usize,

    /// Capacity of each event bus topic.
    pub event_buffer: usize,
}

impl EngineConfig {
    pub const DEFAULT_TICK_RATE_HZ: u32 = 50;
    pub const DEFAULT_MAX_STEP_ADVANCES: usize = 64;
    pub const DEFAULT_EVENT_BUFFER: usize = 256;

    pub fn new() -> Self {
        Self {
            tick_rate_hz: Self::DEFAULT_TICK_RATE_HZ,
            max_step_advances_per_tick: Self::DEFAULT_MAX_STEP_ADVANCES,
            event_buffer: Self::DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_tick_rate(mut self, tick_rate_hz: u32) -> Self {
        self.tick_rate_hz = tick_rate_hz;
        self
    }

    /// Length of one tick in seconds. A zero rate is treated as 1 Hz.
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate_hz.max(1) as f32
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
