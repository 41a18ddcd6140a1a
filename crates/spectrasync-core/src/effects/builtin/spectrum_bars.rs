use super::group_energy;
use crate::effects::{
    hsv_to_rgba, EffectError, EffectParams, FrameInput, ModuleInstance, ParamKey, VisualEffect,
};
use crate::scene::{Camera, ObjectKind, Scene, SceneObject};
use glam::Vec3;

const BASE_BARS: f32 = 32.0;
const MAX_HEIGHT: f32 = 6.0;
const MIN_HEIGHT: f32 = 0.02;
const BAR_SPACING: f32 = 0.25;

/// A row of bars, one per group of frequency bins
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectrumBars;

struct BarsState {
    heights: Vec<f32>,
}

impl VisualEffect for SpectrumBars {
    fn name(&self) -> &str {
        "Spectrum Bars"
    }

    fn create(
        &self,
        scene: &mut dyn Scene,
        params: &EffectParams,
    ) -> Result<ModuleInstance, EffectError> {
        let density = params.resolve(ParamKey::PatternDensity, 1.0);
        if density <= 0.0 {
            return Err(EffectError::InvalidParams {
                effect: "spectrum-bars".to_string(),
                reason: format!("patternDensity must be positive, got {}", density),
            });
        }
        let bar_count = (BASE_BARS * density).round().clamp(4.0, 256.0) as usize;
        let wireframe = params.resolve_flag(ParamKey::Wireframe, false);
        let width = bar_count as f32 * BAR_SPACING;

        let mut objects = Vec::with_capacity(bar_count);
        for i in 0..bar_count {
            let x = i as f32 * BAR_SPACING - width / 2.0;
            let mut bar = SceneObject::new(ObjectKind::Mesh)
                .at(Vec3::new(x, 0.0, 0.0))
                .with_color(hsv_to_rgba(i as f32 / bar_count as f32, 0.8, 1.0, 1.0));
            bar.scale = Vec3::new(BAR_SPACING * 0.8, MIN_HEIGHT, BAR_SPACING * 0.8);
            bar.wireframe = wireframe;
            objects.push(scene.add(bar)?);
        }

        Ok(ModuleInstance::new(
            objects,
            BarsState {
                heights: vec![0.0; bar_count],
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
        let scale = frame.params.resolve(ParamKey::Scale, 1.0);
        let fluidity = frame.params.resolve(ParamKey::Fluidity, 0.5).clamp(0.0, 0.95);
        let speed = frame.params.resolve(ParamKey::Speed, 1.0);
        let hue_shift = if frame.params.resolve_flag(ParamKey::ColorCycle, false) {
            (frame.elapsed as f32 * speed * 0.1).rem_euclid(1.0)
        } else {
            0.0
        };

        let Some((objects, state)) = instance.parts_mut::<BarsState>() else {
            return;
        };
        let bar_count = state.heights.len();

        for (i, id) in objects.iter().enumerate().take(bar_count) {
            let target = group_energy(frame.features, i, bar_count) * intensity;
            let height = state.heights[i] * fluidity + target * (1.0 - fluidity);
            state.heights[i] = height;

            if let Some(bar) = scene.get_mut(*id) {
                let h = (height * MAX_HEIGHT * scale).max(MIN_HEIGHT);
                bar.scale.y = h;
                bar.position.y = h / 2.0;
                let hue = i as f32 / bar_count as f32 + hue_shift;
                bar.color = hsv_to_rgba(hue, 0.8, 0.4 + 0.6 * height.min(1.0), 1.0);
            }
        }
    }
}
