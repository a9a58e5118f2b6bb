//! Archetype loader.
//!
//! Loads [`ArchetypeSpec`]s from RON files. One file holds one archetype.

use std::path::Path;

use game_core::{Archetype, ArchetypeSpec};

use crate::loaders::{LoadResult, read_file};

/// Loader for archetype definitions from RON files.
pub struct ArchetypeLoader;

impl ArchetypeLoader {
    /// Load and validate an archetype from a RON file.
    ///
    /// RON format: a single `ArchetypeSpec`, e.g.
    ///
    /// ```ron
    /// (
    ///     name: "cave_slime",
    ///     max_health: 60,
    ///     phases: [(name: "main", table: (initial: patrol, safe_state: patrol, states: [...]))],
    /// )
    /// ```
    pub fn load(path: &Path) -> LoadResult<ArchetypeSpec> {
        let content = read_file(path)?;
        Self::parse(&content).map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))
    }

    /// Parse and validate an archetype from RON source.
    pub fn parse(source: &str) -> LoadResult<ArchetypeSpec> {
        let spec: ArchetypeSpec = ron::from_str(source)
            .map_err(|e| anyhow::anyhow!("Failed to parse archetype RON: {}", e))?;
        spec.validate()
            .map_err(|e| anyhow::anyhow!("Invalid archetype '{}': {}", spec.name, e))?;
        Ok(spec)
    }

    /// Load an archetype and compile it for spawning.
    pub fn load_compiled(path: &Path) -> LoadResult<Archetype> {
        let spec = Self::load(path)?;
        let name = spec.name.clone();
        spec.compile()
            .map_err(|e| anyhow::anyhow!("Failed to compile archetype '{}': {}", name, e))
    }

    /// Load every `*.ron` file in `dir`, in file name order.
    pub fn load_dir(dir: &Path) -> LoadResult<Vec<ArchetypeSpec>> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("Failed to read directory {}: {}", dir.display(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "ron") {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|path| Self::load(path)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::BehaviorState;

    const BAT: &str = r#"(
        name: "bat",
        max_health: 30,
        phases: [(
            name: "main",
            table: (
                initial: idle,
                safe_state: idle,
                states: [
                    (state: idle, transitions: [(guard: TargetWithin(6.0), to: chase)]),
                    (state: chase, requires_target: true, movement: Chase(speed: 3.0)),
                ],
            ),
        )],
    )"#;

    #[test]
    fn parses_minimal_archetype() {
        let spec = ArchetypeLoader::parse(BAT).unwrap();
        assert_eq!(spec.name, "bat");
        assert_eq!(spec.max_health, 30);
        assert_eq!(spec.phases[0].table.initial, BehaviorState::Idle);
        assert!(spec.phases[0].table.get(BehaviorState::Chase).unwrap().requires_target);
    }

    #[test]
    fn rejects_unknown_state_reference() {
        let broken = BAT.replace("to: chase", "to: rampage");
        let error = ArchetypeLoader::parse(&broken).unwrap_err().to_string();
        assert!(error.contains("bat"), "{error}");
    }

    #[test]
    fn rejects_oversized_repeat_before_unrolling() {
        let looping = BAT.replace(
            "(state: chase, requires_target: true, movement: Chase(speed: 3.0)),",
            r#"(state: chase, requires_target: true, movement: Chase(speed: 3.0)),
                    (
                        state: rampage,
                        sequence: Some((
                            name: "stomp",
                            body: [(label: "stomp", wait: Seconds(0.1))],
                            repeat: Times(4000000000),
                        )),
                    ),"#,
        );
        let error = ArchetypeLoader::parse(&looping).unwrap_err().to_string();
        assert!(error.contains("stomp"), "{error}");
        assert!(error.contains("4000000000 steps"), "{error}");
    }

    #[test]
    fn load_dir_reads_ron_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_bat.ron"), BAT.replace("\"bat\"", "\"second\"")).unwrap();
        std::fs::write(dir.path().join("a_bat.ron"), BAT).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let specs = ArchetypeLoader::load_dir(dir.path()).unwrap();
        let names: Vec<_> = specs.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(names, ["bat", "second"]);
    }

    #[test]
    fn load_compiled_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ArchetypeLoader::load_compiled(&dir.path().join("missing.ron")).is_err());
    }
}
