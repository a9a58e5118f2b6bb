//! Data-driven archetype content and loaders.
//!
//! This crate houses the built-in enemy and boss archetypes and provides
//! loaders for RON/TOML data files:
//! - Archetypes: state tables, attack sequences, thresholds, phases (RON)
//! - Engine configuration: tick rate and budgets (TOML)
//!
//! Content is compiled into [`game_core::Archetype`]s and shared by every agent
//! spawned from it; it never appears in agent state.

pub mod presets;
pub mod registry;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use presets::{PRESET_NAMES, preset, preset_names};
pub use registry::ArchetypeRegistry;

#[cfg(feature = "loaders")]
pub use loaders::{ArchetypeLoader, ConfigLoader, ContentFactory, LoadResult};
