//! Active effect lifecycle: activate, animate, dispose.

use super::{EffectError, EffectParams, EffectRegistry, FrameInput, ModuleInstance, ParamValue};
use crate::audio::{BeatInfo, FeatureSummary};
use crate::scene::{Camera, ObjectId, Scene, SceneError, SceneObject};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::VisualEffect;

/// Dispatcher lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatcherState {
    /// No effect active
    Idle,
    /// Effect built, not yet animated
    Created,
    /// Effect has animated at least once
    Animating,
    /// Effect objects are being released
    Disposing,
}

struct ActiveEffect {
    id: String,
    effect: Arc<dyn VisualEffect>,
    instance: ModuleInstance,
}

/// Scene wrapper that remembers what was added through it
struct TrackingScene<'a> {
    inner: &'a mut dyn Scene,
    added: Vec<ObjectId>,
}

impl Scene for TrackingScene<'_> {
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn add(&mut self, object: SceneObject) -> Result<ObjectId, SceneError> {
        let id = self.inner.add(object)?;
        self.added.push(id);
        Ok(id)
    }

    fn remove(&mut self, id: ObjectId) -> Result<SceneObject, SceneError> {
        let object = self.inner.remove(id)?;
        self.added.retain(|a| *a != id);
        Ok(object)
    }

    fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.inner.get(id)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.inner.get_mut(id)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Owns the active effect and drives its lifecycle
pub struct EffectDispatcher {
    registry: EffectRegistry,
    params: EffectParams,
    active: Option<ActiveEffect>,
    state: DispatcherState,
}

impl EffectDispatcher {
    /// Create an idle dispatcher over `registry`
    pub fn new(registry: EffectRegistry) -> Self {
        Self {
            registry,
            params: EffectParams::default(),
            active: None,
            state: DispatcherState::Idle,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Id of the active effect
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.id.as_str())
    }

    /// Objects owned by the active effect
    pub fn active_objects(&self) -> &[ObjectId] {
        self.active
            .as_ref()
            .map(|a| a.instance.objects.as_slice())
            .unwrap_or(&[])
    }

    /// Registered effects
    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    /// Registered effects, for adding more
    pub fn registry_mut(&mut self) -> &mut EffectRegistry {
        &mut self.registry
    }

    /// Current parameters
    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    /// Parameters for user controls
    pub fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    /// Replace all parameters
    pub fn set_params(&mut self, params: EffectParams) {
        self.params = params;
    }

    /// Set one parameter by name; unknown keys are ignored
    pub fn set_param(&mut self, key: &str, value: impl Into<ParamValue>) -> bool {
        self.params.set(key, value)
    }

    /// Switch to effect `id`.
    ///
    /// The current effect is fully disposed before the new one is created.
    /// On any error the dispatcher is left idle.
    pub fn activate(&mut self, id: &str, scene: &mut dyn Scene) -> Result<(), EffectError> {
        self.deactivate(scene);

        let Some(effect) = self.registry.get(id) else {
            warn!("Unknown effect '{}'", id);
            return Err(EffectError::UnknownEffect(id.to_string()));
        };

        if !scene.is_ready() {
            warn!("Scene not ready, effect '{}' not activated", id);
            return Err(EffectError::SceneNotReady);
        }

        let mut tracking = TrackingScene {
            inner: scene,
            added: Vec::new(),
        };
        match effect.create(&mut tracking, &self.params) {
            Ok(instance) => {
                info!(
                    "Activated effect '{}' with {} objects",
                    id,
                    instance.objects.len()
                );
                self.active = Some(ActiveEffect {
                    id: id.to_string(),
                    effect,
                    instance,
                });
                self.state = DispatcherState::Created;
                Ok(())
            }
            Err(e) => {
                error!("Failed to create effect '{}': {}", id, e);
                let TrackingScene { inner, added } = tracking;
                if !added.is_empty() {
                    debug!("Rolling back {} objects from '{}'", added.len(), id);
                }
                release_objects(inner, &added, id);
                Err(e)
            }
        }
    }

    /// Release the active effect, if any.
    ///
    /// Every owned object is removed; failures are logged and do not stop the
    /// remaining removals.
    pub fn deactivate(&mut self, scene: &mut dyn Scene) {
        let Some(active) = self.active.take() else {
            return;
        };

        self.state = DispatcherState::Disposing;
        debug!(
            "Disposing effect '{}' ({} objects)",
            active.id,
            active.instance.objects.len()
        );
        release_objects(scene, &active.instance.objects, &active.id);
        self.state = DispatcherState::Idle;
    }

    /// Animate the active effect for one frame; no-op when idle
    pub fn animate(
        &mut self,
        scene: &mut dyn Scene,
        features: &FeatureSummary,
        elapsed: f64,
        beat: Option<&BeatInfo>,
        camera: Option<&mut Camera>,
    ) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let frame = FrameInput {
            features,
            elapsed,
            params: &self.params,
            beat,
        };
        active
            .effect
            .animate(scene, &mut active.instance, &frame, camera);
        self.state = DispatcherState::Animating;
    }
}

fn release_objects(scene: &mut dyn Scene, objects: &[ObjectId], effect_id: &str) {
    for &id in objects {
        if let Err(e) = scene.remove(id) {
            warn!(
                "Effect '{}': failed to release object {}: {}",
                effect_id, id, e
            );
        }
    }
}

impl std::fmt::Debug for EffectDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectDispatcher")
            .field("state", &self.state)
            .field("active", &self.active_id())
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::ParamKey;
    use crate::scene::{MemoryScene, ObjectKind};

    /// Adds `count` objects then optionally fails
    struct Probe {
        count: usize,
        fail: bool,
    }

    impl VisualEffect for Probe {
        fn name(&self) -> &str {
            "Probe"
        }

        fn create(
            &self,
            scene: &mut dyn Scene,
            _params: &EffectParams,
        ) -> Result<ModuleInstance, EffectError> {
            let mut objects = Vec::new();
            for _ in 0..self.count {
                objects.push(scene.add(SceneObject::new(ObjectKind::Mesh))?);
            }
            if self.fail {
                return Err(EffectError::InvalidParams {
                    effect: "probe".into(),
                    reason: "told to fail".into(),
                });
            }
            Ok(ModuleInstance::new(objects, 0u32))
        }

        fn animate(
            &self,
            _scene: &mut dyn Scene,
            instance: &mut ModuleInstance,
            frame: &FrameInput<'_>,
            _camera: Option<&mut Camera>,
        ) {
            if let Some(n) = instance.state_mut::<u32>() {
                *n += frame.params.resolve(ParamKey::Speed, 1.0) as u32;
            }
        }
    }

    fn dispatcher() -> EffectDispatcher {
        let mut registry = EffectRegistry::new();
        registry.register("a", Arc::new(Probe { count: 3, fail: false }));
        registry.register("b", Arc::new(Probe { count: 2, fail: false }));
        registry.register("broken", Arc::new(Probe { count: 4, fail: true }));
        EffectDispatcher::new(registry)
    }

    #[test]
    fn test_lifecycle() {
        let mut scene = MemoryScene::new();
        let mut d = dispatcher();
        assert_eq!(d.state(), DispatcherState::Idle);

        d.activate("a", &mut scene).unwrap();
        assert_eq!(d.state(), DispatcherState::Created);
        assert_eq!(scene.len(), 3);

        let features = FeatureSummary::silent(8);
        d.animate(&mut scene, &features, 0.0, None, None);
        assert_eq!(d.state(), DispatcherState::Animating);

        d.activate("b", &mut scene).unwrap();
        assert_eq!(d.active_id(), Some("b"));
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.removed_count(), 3);

        d.deactivate(&mut scene);
        assert_eq!(d.state(), DispatcherState::Idle);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_unknown_effect_leaves_idle() {
        let mut scene = MemoryScene::new();
        let mut d = dispatcher();
        d.activate("a", &mut scene).unwrap();
        assert_eq!(
            d.activate("missing", &mut scene),
            Err(EffectError::UnknownEffect("missing".into()))
        );
        assert_eq!(d.state(), DispatcherState::Idle);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_scene_not_ready() {
        let mut scene = MemoryScene::new();
        scene.set_ready(false);
        let mut d = dispatcher();
        assert_eq!(
            d.activate("a", &mut scene),
            Err(EffectError::SceneNotReady)
        );
        assert_eq!(d.state(), DispatcherState::Idle);
    }

    #[test]
    fn test_failed_create_rolls_back() {
        let mut scene = MemoryScene::new();
        let mut d = dispatcher();
        assert!(d.activate("broken", &mut scene).is_err());
        assert_eq!(d.state(), DispatcherState::Idle);
        assert_eq!(scene.added_count(), 4);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_scene_full_rolls_back() {
        let mut scene = MemoryScene::with_capacity_limit(2);
        let mut d = dispatcher();
        let err = d.activate("a", &mut scene).unwrap_err();
        assert_eq!(err, EffectError::Scene(SceneError::Full(2)));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_disposal_continues_past_failure() {
        let mut scene = MemoryScene::new();
        let mut d = dispatcher();
        d.activate("a", &mut scene).unwrap();
        let owned = d.active_objects().to_vec();
        scene.lock(owned[0]);

        d.deactivate(&mut scene);
        assert_eq!(d.state(), DispatcherState::Idle);
        assert_eq!(scene.ids(), vec![owned[0]]);
        assert_eq!(scene.removed_count(), 2);
    }

    #[test]
    fn test_animate_idle_is_noop() {
        let mut scene = MemoryScene::new();
        let mut d = dispatcher();
        let features = FeatureSummary::silent(8);
        d.animate(&mut scene, &features, 0.0, None, None);
        assert_eq!(d.state(), DispatcherState::Idle);
    }

    #[test]
    fn test_set_param() {
        let mut d = dispatcher();
        assert!(d.set_param("speed", 2.0));
        assert!(!d.set_param("glow", 1.0));
        assert_eq!(d.params().speed, Some(2.0));
    }
}
