//! Effects shipped with the engine.

mod particle_field;
mod pulse_sphere;
mod spectrum_bars;
mod waveform_ring;

pub use particle_field::ParticleField;
pub use pulse_sphere::PulseSphere;
pub use spectrum_bars::SpectrumBars;
pub use waveform_ring::WaveformRing;

use super::registry::EffectRegistry;
use crate::audio::FeatureSummary;
use std::sync::Arc;

/// Register every built-in effect under its canonical id
pub fn register_all(registry: &mut EffectRegistry) {
    registry.register("spectrum-bars", Arc::new(SpectrumBars));
    registry.register("pulse-sphere", Arc::new(PulseSphere));
    registry.register("particle-field", Arc::new(ParticleField));
    registry.register("waveform-ring", Arc::new(WaveformRing));
}

/// Mean normalized frequency energy of group `index` out of `groups`
fn group_energy(features: &FeatureSummary, index: usize, groups: usize) -> f32 {
    let bins = features.bin_count();
    if bins == 0 || groups == 0 {
        return 0.0;
    }
    let start = index * bins / groups;
    let end = ((index + 1) * bins / groups).max(start + 1).min(bins);
    if start >= end {
        return 0.0;
    }
    (start..end).map(|i| features.bin(i)).sum::<f32>() / (end - start) as f32
}

/// Stable pseudo-random value in [0, 1) derived from an index and a salt
fn unit_hash(index: u32, salt: u32) -> f32 {
    let mut x = index.wrapping_mul(0x9E37_79B9) ^ salt.wrapping_mul(0x85EB_CA6B);
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB_352D);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846C_A68B);
    x ^= x >> 16;
    (x >> 8) as f32 / (1u32 << 24) as f32
}
