use super::unit_hash;
use crate::effects::{
    hsv_to_rgba, EffectError, EffectParams, FrameInput, ModuleInstance, ParamKey, VisualEffect,
};
use crate::scene::{Camera, ObjectKind, Scene, SceneObject};
use glam::Vec3;
use std::f32::consts::TAU;

const BASE_PARTICLES: f32 = 500.0;
const FIELD_RADIUS: f32 = 5.0;
const KICK_DECAY: f32 = 0.85;

/// A swirling point cloud that bursts outward on beats
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticleField;

struct FieldState {
    phases: Vec<f32>,
    radii: Vec<f32>,
    heights: Vec<f32>,
    kicks: Vec<f32>,
    swirl: f32,
}

impl FieldState {
    fn new(count: usize) -> Self {
        let seeded = |salt| (0..count as u32).map(|i| unit_hash(i, salt)).collect::<Vec<_>>();
        Self {
            phases: seeded(1),
            radii: seeded(2)
                .into_iter()
                .map(|r| FIELD_RADIUS * (0.3 + 0.7 * r))
                .collect(),
            heights: seeded(3)
                .into_iter()
                .map(|h| (h - 0.5) * FIELD_RADIUS)
                .collect(),
            kicks: vec![0.0; count],
            swirl: 0.0,
        }
    }

    fn position(&self, i: usize) -> Vec3 {
        let angle = self.phases[i] * TAU + self.swirl * (0.5 + self.phases[i]);
        let r = self.radii[i] * (1.0 + self.kicks[i]);
        Vec3::new(angle.cos() * r, self.heights[i], angle.sin() * r)
    }
}

impl VisualEffect for ParticleField {
    fn name(&self) -> &str {
        "Particle Field"
    }

    fn create(
        &self,
        scene: &mut dyn Scene,
        params: &EffectParams,
    ) -> Result<ModuleInstance, EffectError> {
        let complexity = params.resolve(ParamKey::Complexity, 1.0);
        let count = (BASE_PARTICLES * complexity).round().clamp(50.0, 5000.0) as usize;
        let state = FieldState::new(count);

        let vertices = (0..count).map(|i| state.position(i)).collect();
        let colors = state
            .phases
            .iter()
            .map(|p| hsv_to_rgba(*p, 0.6, 1.0, 1.0))
            .collect();
        let mut points = SceneObject::new(ObjectKind::Points).with_vertices(vertices);
        points.vertex_colors = colors;
        let id = scene.add(points)?;

        Ok(ModuleInstance::new(vec![id], state))
    }

    fn animate(
        &self,
        scene: &mut dyn Scene,
        instance: &mut ModuleInstance,
        frame: &FrameInput<'_>,
        camera: Option<&mut Camera>,
    ) {
        let intensity = frame.params.resolve(ParamKey::Intensity, 1.0);
        let speed = frame.params.resolve(ParamKey::Speed, 1.0);
        let rotation_speed = frame.params.resolve(ParamKey::RotationSpeed, 0.1);
        let bands = frame.features.band_energy;

        let Some((objects, state)) = instance.parts_mut::<FieldState>() else {
            return;
        };

        state.swirl += speed * (0.01 + 0.05 * bands.mid * intensity);

        let beat_strength = frame
            .beat
            .filter(|b| b.is_beat)
            .map(|b| b.strength.max(0.1) * intensity);
        for (i, kick) in state.kicks.iter_mut().enumerate() {
            *kick *= KICK_DECAY;
            if let Some(strength) = beat_strength {
                *kick += strength * (0.2 + 0.3 * unit_hash(i as u32, 4));
            }
        }

        if let Some(&id) = objects.first() {
            if let Some(points) = scene.get_mut(id) {
                let hue_shift = bands.treble * 0.2;
                for (i, vertex) in points.vertices.iter_mut().enumerate() {
                    *vertex = state.position(i);
                }
                for (color, phase) in points.vertex_colors.iter_mut().zip(&state.phases) {
                    *color = hsv_to_rgba(phase + hue_shift, 0.6, 0.6 + 0.4 * bands.bass, 1.0);
                }
            }
        }

        if let Some(camera) = camera {
            if rotation_speed != 0.0 {
                let offset = camera.position - camera.target;
                let horizontal = (offset.x * offset.x + offset.z * offset.z).sqrt();
                let angle = frame.elapsed as f32 * rotation_speed;
                camera.position = camera.target
                    + Vec3::new(angle.sin() * horizontal, offset.y, angle.cos() * horizontal);
            }
        }
    }
}
