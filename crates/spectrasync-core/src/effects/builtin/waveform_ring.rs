use crate::effects::{
    hsv_to_rgba, EffectError, EffectParams, FrameInput, ModuleInstance, ParamKey, VisualEffect,
};
use crate::scene::{Camera, ObjectKind, Scene, SceneObject};
use glam::{Quat, Vec3};
use std::f32::consts::TAU;

const BASE_SEGMENTS: f32 = 128.0;
const RING_RADIUS: f32 = 3.0;

/// A closed line whose radius traces the waveform
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveformRing;

struct RingState {
    segments: usize,
    radius: f32,
}

fn ring_vertex(k: usize, segments: usize, r: f32) -> Vec3 {
    let theta = k as f32 / segments as f32 * TAU;
    Vec3::new(theta.cos() * r, theta.sin() * r, 0.0)
}

impl VisualEffect for WaveformRing {
    fn name(&self) -> &str {
        "Waveform Ring"
    }

    fn create(
        &self,
        scene: &mut dyn Scene,
        params: &EffectParams,
    ) -> Result<ModuleInstance, EffectError> {
        let complexity = params.resolve(ParamKey::Complexity, 1.0);
        let segments = (BASE_SEGMENTS * complexity).round().clamp(16.0, 1024.0) as usize;
        let radius = RING_RADIUS * params.resolve(ParamKey::Scale, 1.0).max(0.01);

        // Closed loop: last vertex repeats the first
        let vertices = (0..=segments)
            .map(|k| ring_vertex(k % segments, segments, radius))
            .collect();
        let ring = SceneObject::new(ObjectKind::Line)
            .with_vertices(vertices)
            .with_color(hsv_to_rgba(0.45, 0.8, 1.0, 1.0));
        let id = scene.add(ring)?;

        Ok(ModuleInstance::new(vec![id], RingState { segments, radius }))
    }

    fn animate(
        &self,
        scene: &mut dyn Scene,
        instance: &mut ModuleInstance,
        frame: &FrameInput<'_>,
        _camera: Option<&mut Camera>,
    ) {
        let intensity = frame.params.resolve(ParamKey::Intensity, 1.0);
        let rotation_speed = frame.params.resolve(ParamKey::RotationSpeed, 0.2);
        let speed = frame.params.resolve(ParamKey::Speed, 1.0);
        let color_cycle = frame.params.resolve_flag(ParamKey::ColorCycle, true);

        let Some((objects, state)) = instance.parts_mut::<RingState>() else {
            return;
        };
        let Some(&id) = objects.first() else {
            return;
        };
        let Some(ring) = scene.get_mut(id) else {
            return;
        };

        let samples = frame.features.time_domain.len();
        let segments = state.segments;
        for (k, vertex) in ring.vertices.iter_mut().enumerate() {
            let k = k % segments;
            let sample = if samples == 0 {
                0.0
            } else {
                frame.features.waveform(k * samples / segments)
            };
            let r = state.radius * (1.0 + 0.5 * sample * intensity);
            *vertex = ring_vertex(k, segments, r);
        }

        ring.rotation = Quat::from_rotation_z(frame.elapsed as f32 * rotation_speed);
        let hue = if color_cycle {
            0.45 + frame.elapsed as f32 * speed * 0.05
        } else {
            0.45
        };
        let energy = frame.features.band_energy.overall();
        ring.color = hsv_to_rgba(hue, 0.8, 0.5 + 0.5 * energy.min(1.0), 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FeatureSummary;
    use crate::scene::MemoryScene;

    #[test]
    fn test_ring_is_closed() {
        let mut scene = MemoryScene::new();
        let instance = WaveformRing.create(&mut scene, &EffectParams::new()).unwrap();
        let ring = scene.get(instance.objects[0]).unwrap();
        assert_eq!(ring.vertices.len(), 129);
        assert_eq!(ring.vertices[0], ring.vertices[128]);
    }

    #[test]
    fn test_waveform_moves_radius() {
        let mut scene = MemoryScene::new();
        let params = EffectParams::new();
        let mut instance = WaveformRing.create(&mut scene, &params).unwrap();

        let mut features = FeatureSummary::silent(256);
        features.time_domain.fill(128);
        features.time_domain[0] = 255;
        let frame = FrameInput {
            features: &features,
            elapsed: 0.0,
            params: &params,
            beat: None,
        };
        WaveformRing.animate(&mut scene, &mut instance, &frame, None);

        let ring = scene.get(instance.objects[0]).unwrap();
        assert!(ring.vertices[0].length() > RING_RADIUS);
        assert!((ring.vertices[1].length() - RING_RADIUS).abs() < 1e-4);
    }
}
