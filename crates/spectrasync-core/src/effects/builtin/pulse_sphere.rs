use crate::effects::{
    hsv_to_rgba, EffectError, EffectParams, FrameInput, ModuleInstance, ParamKey, VisualEffect,
};
use crate::scene::{Camera, ObjectKind, Scene, SceneObject};
use glam::{Quat, Vec3};

/// Frames a beat flash lasts
pub const FLASH_FRAMES: u32 = 8;

const BASE_HUE: f32 = 0.62;

/// A sphere breathing with the bass, flashing on every beat
#[derive(Debug, Clone, Copy, Default)]
pub struct PulseSphere;

struct PulseState {
    base_scale: f32,
    flash_frames: u32,
}

impl VisualEffect for PulseSphere {
    fn name(&self) -> &str {
        "Pulse Sphere"
    }

    fn create(
        &self,
        scene: &mut dyn Scene,
        params: &EffectParams,
    ) -> Result<ModuleInstance, EffectError> {
        let base_scale = params.resolve(ParamKey::Scale, 1.0).max(0.01);
        let mut sphere =
            SceneObject::new(ObjectKind::Mesh).with_color(hsv_to_rgba(BASE_HUE, 0.7, 0.8, 1.0));
        sphere.scale = Vec3::splat(base_scale);
        sphere.wireframe = params.resolve_flag(ParamKey::Wireframe, false);
        let id = scene.add(sphere)?;

        Ok(ModuleInstance::new(
            vec![id],
            PulseState {
                base_scale,
                flash_frames: 0,
            },
        ))
    }

    fn animate(
        &self,
        scene: &mut dyn Scene,
        instance: &mut ModuleInstance,
        frame: &FrameInput<'_>,
        _camera: Option<&mut Camera>,
    ) {
        let intensity = frame.params.resolve(ParamKey::Intensity, 1.0);
        let rotation_speed = frame.params.resolve(ParamKey::RotationSpeed, 0.3);
        let color_cycle = frame.params.resolve_flag(ParamKey::ColorCycle, false);
        let speed = frame.params.resolve(ParamKey::Speed, 1.0);

        let Some((objects, state)) = instance.parts_mut::<PulseState>() else {
            return;
        };

        if frame.is_beat() {
            state.flash_frames = FLASH_FRAMES;
        } else {
            state.flash_frames = state.flash_frames.saturating_sub(1);
        }
        let flash = state.flash_frames as f32 / FLASH_FRAMES as f32;

        let Some(&id) = objects.first() else {
            return;
        };
        let Some(sphere) = scene.get_mut(id) else {
            return;
        };

        let bass = frame.features.band_energy.bass;
        sphere.scale = Vec3::splat(state.base_scale * (1.0 + bass * intensity));
        sphere.rotation = Quat::from_rotation_y(frame.elapsed as f32 * rotation_speed);

        let hue = if color_cycle {
            BASE_HUE + frame.elapsed as f32 * speed * 0.05
        } else {
            BASE_HUE
        };
        // Flash blends toward white
        sphere.color = hsv_to_rgba(hue, 0.7 * (1.0 - flash), 0.8 + 0.2 * flash, 1.0);
    }
}
