//! Name → compiled archetype lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use game_core::{Archetype, ArchetypeSpec, SpecError};
use tracing::debug;

use crate::presets;

/// Compiled archetypes keyed by name.
///
/// Archetypes are compiled once and shared (`Arc`) by every agent spawned
/// from them.
#[derive(Debug, Default)]
pub struct ArchetypeRegistry {
    archetypes: BTreeMap<String, Arc<Archetype>>,
}

impl ArchetypeRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in preset.
    pub fn with_presets() -> Result<Self, SpecError> {
        let mut registry = Self::new();
        for name in presets::preset_names() {
            if let Some(spec) = presets::preset(name) {
                registry.insert(spec)?;
            }
        }
        Ok(registry)
    }

    /// Compiles `spec` and stores it, replacing an archetype of the same name.
    pub fn insert(&mut self, spec: ArchetypeSpec) -> Result<Arc<Archetype>, SpecError> {
        let archetype = Arc::new(spec.compile()?);
        let name = archetype.name().to_owned();
        if self
            .archetypes
            .insert(name.clone(), Arc::clone(&archetype))
            .is_some()
        {
            debug!(target: "game_content::registry", archetype = %name, "archetype replaced");
        }
        Ok(archetype)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Archetype>> {
        self.archetypes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.archetypes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.archetypes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_registered_by_name() {
        let registry = ArchetypeRegistry::with_presets().unwrap();
        assert_eq!(registry.len(), presets::PRESET_NAMES.len());
        assert!(registry.contains("slime_king"));
        assert_eq!(registry.get("reaper").unwrap().max_health(), 500);
        assert!(registry.get("dragon").is_none());
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut registry = ArchetypeRegistry::new();
        registry.insert(presets::slime()).unwrap();

        let mut tougher = presets::slime();
        tougher.max_health = 250;
        registry.insert(tougher).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("slime").unwrap().max_health(), 250);
    }

    #[test]
    fn invalid_spec_is_not_stored() {
        let mut registry = ArchetypeRegistry::new();
        let mut broken = presets::slime();
        broken.phases.clear();

        assert!(matches!(
            registry.insert(broken),
            Err(SpecError::NoPhases { .. })
        ));
        assert!(registry.is_empty());
    }
}
