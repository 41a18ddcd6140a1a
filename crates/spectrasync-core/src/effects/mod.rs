//! Visual effect modules and their lifecycle.
//!
//! An effect builds its objects once in [`VisualEffect::create`] and then
//! mutates them every frame in [`VisualEffect::animate`]. Anything the effect
//! needs to remember between frames lives in the [`ModuleInstance`] state,
//! never in the effect itself, so the same effect can be shared through the
//! registry.

pub mod builtin;
pub mod dispatcher;
pub mod params;
pub mod registry;

pub use dispatcher::{DispatcherState, EffectDispatcher};
pub use params::{EffectParams, ParamKey, ParamValue};
pub use registry::EffectRegistry;

use crate::audio::{BeatInfo, FeatureSummary};
use crate::scene::{Camera, ObjectId, Scene, SceneError};
use std::any::Any;
use thiserror::Error;

/// Errors from effect activation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    /// No effect registered under this id
    #[error("Unknown effect: {0}")]
    UnknownEffect(String),

    /// The scene cannot accept objects yet
    #[error("Scene is not ready")]
    SceneNotReady,

    /// A scene operation failed while building the effect
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// The effect refused its parameters
    #[error("Invalid parameters for {effect}: {reason}")]
    InvalidParams {
        /// Effect id
        effect: String,
        /// What was wrong
        reason: String,
    },
}

/// Everything an effect sees for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// This frame's audio summary
    pub features: &'a FeatureSummary,
    /// Seconds since the effect loop started
    pub elapsed: f64,
    /// Current user parameters
    pub params: &'a EffectParams,
    /// Beat result, when beat detection ran this frame
    pub beat: Option<&'a BeatInfo>,
}

impl FrameInput<'_> {
    /// Whether a beat fired this frame
    pub fn is_beat(&self) -> bool {
        self.beat.is_some_and(|b| b.is_beat)
    }
}

/// A live effect: the objects it owns and its private per-frame state
pub struct ModuleInstance {
    /// Scene objects created by the effect, released on deactivation
    pub objects: Vec<ObjectId>,
    state: Box<dyn Any + Send>,
}

impl ModuleInstance {
    /// Wrap owned objects and state
    pub fn new<S: Any + Send>(objects: Vec<ObjectId>, state: S) -> Self {
        Self {
            objects,
            state: Box::new(state),
        }
    }

    /// Borrow the state as `S`
    pub fn state<S: Any>(&self) -> Option<&S> {
        self.state.downcast_ref()
    }

    /// Borrow the state mutably as `S`
    pub fn state_mut<S: Any>(&mut self) -> Option<&mut S> {
        self.state.downcast_mut()
    }

    /// Owned objects alongside the mutable state
    pub fn parts_mut<S: Any>(&mut self) -> Option<(&[ObjectId], &mut S)> {
        let state = self.state.downcast_mut()?;
        Some((&self.objects, state))
    }
}

impl std::fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("objects", &self.objects)
            .finish_non_exhaustive()
    }
}

/// A pluggable visual effect
pub trait VisualEffect: Send + Sync {
    /// Human-readable name
    fn name(&self) -> &str;

    /// Build the effect's objects. Must not read audio.
    fn create(
        &self,
        scene: &mut dyn Scene,
        params: &EffectParams,
    ) -> Result<ModuleInstance, EffectError>;

    /// Advance one frame.
    ///
    /// Identical inputs must produce identical scene mutations.
    fn animate(
        &self,
        scene: &mut dyn Scene,
        instance: &mut ModuleInstance,
        frame: &FrameInput<'_>,
        camera: Option<&mut Camera>,
    );
}

/// Convert HSV (all 0.0 - 1.0) to RGBA
pub(crate) fn hsv_to_rgba(h: f32, s: f32, v: f32, a: f32) -> [f32; 4] {
    let h = h.rem_euclid(1.0) * 6.0;
    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m, a]
}
