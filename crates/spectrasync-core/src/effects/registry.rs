//! Id to effect lookup table.

use super::builtin;
use super::VisualEffect;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registered effects by string id
#[derive(Default, Clone)]
pub struct EffectRegistry {
    effects: HashMap<String, Arc<dyn VisualEffect>>,
}

impl EffectRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in effect
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register an effect, returning the one it replaced
    pub fn register(
        &mut self,
        id: impl Into<String>,
        effect: Arc<dyn VisualEffect>,
    ) -> Option<Arc<dyn VisualEffect>> {
        let id = id.into();
        debug!("Registering effect '{}' ({})", id, effect.name());
        self.effects.insert(id, effect)
    }

    /// Look up an effect
    pub fn get(&self, id: &str) -> Option<Arc<dyn VisualEffect>> {
        self.effects.get(id).cloned()
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.effects.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.effects.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered effects
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::builtin::PulseSphere;

    #[test]
    fn test_builtin_ids() {
        let registry = EffectRegistry::with_builtin();
        assert_eq!(
            registry.ids(),
            vec!["particle-field", "pulse-sphere", "spectrum-bars", "waveform-ring"]
        );
        assert!(registry.contains("pulse-sphere"));
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = EffectRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register("a", Arc::new(PulseSphere)).is_none());
        assert!(registry.register("a", Arc::new(PulseSphere)).is_some());
        assert_eq!(registry.len(), 1);
    }
}
