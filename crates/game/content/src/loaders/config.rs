//! Engine configuration loader.

use std::path::Path;

use game_core::EngineConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for engine configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Missing keys fall back to [`EngineConfig::default`].
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))
    }

    pub fn parse(source: &str) -> LoadResult<EngineConfig> {
        let config: EngineConfig = toml::from_str(source)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        if config.tick_rate_hz == 0 {
            anyhow::bail!("tick_rate_hz must be positive");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ConfigLoader::parse("tick_rate_hz = 20\n").unwrap();
        assert_eq!(config.tick_rate_hz, 20);
        assert_eq!(
            config.max_step_advances_per_tick,
            EngineConfig::DEFAULT_MAX_STEP_ADVANCES
        );
        assert!((config.tick_seconds() - 0.05).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        assert!(ConfigLoader::parse("tick_rate_hz = 0\n").is_err());
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "tick_rate_hz = \"fast\"\n").unwrap();

        let error = ConfigLoader::load(&path).unwrap_err().to_string();
        assert!(error.contains("engine.toml"), "{error}");
    }
}
