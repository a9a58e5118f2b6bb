//! Content factory for loading a whole data directory.

use std::path::{Path, PathBuf};

use game_core::{ArchetypeSpec, EngineConfig};
use tracing::info;

use crate::loaders::{ArchetypeLoader, ConfigLoader, LoadResult};
use crate::registry::ArchetypeRegistry;

/// Content factory that loads all content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── engine.toml
/// └── archetypes/
///     ├── cave_slime.ron
///     └── ...
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load engine configuration from `engine.toml`, or defaults if absent.
    pub fn load_config(&self) -> LoadResult<EngineConfig> {
        let path = self.data_dir.join("engine.toml");
        if !path.exists() {
            return Ok(EngineConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load every archetype under `archetypes/`.
    pub fn load_archetypes(&self) -> LoadResult<Vec<ArchetypeSpec>> {
        ArchetypeLoader::load_dir(&self.data_dir.join("archetypes"))
    }

    /// Built-in presets overlaid with the directory's archetypes.
    ///
    /// A file archetype with a preset's name replaces that preset.
    pub fn load_registry(&self) -> LoadResult<ArchetypeRegistry> {
        let mut registry = ArchetypeRegistry::with_presets()?;
        let dir = self.data_dir.join("archetypes");
        if dir.is_dir() {
            for spec in ArchetypeLoader::load_dir(&dir)? {
                registry.insert(spec)?;
            }
        }
        info!(
            target: "game_content::factory",
            data_dir = %self.data_dir.display(),
            archetypes = registry.len(),
            "content loaded"
        );
        Ok(registry)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
