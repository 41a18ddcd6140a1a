//! Beat detection over the per-frame band energy stream.
//!
//! The detector keeps an exponentially-weighted moving average of the bass
//! energy and flags a beat when the instantaneous value overshoots it by a
//! multiplicative threshold. Beats are edge-triggered and separated by a
//! refractory period counted in frames.

use super::{BandEnergy, FrequencyBand};
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Tunable thresholds for [`BeatDetector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatDetectorConfig {
    /// Moving-average decay per frame (0.0 - 1.0, higher = slower baseline)
    pub decay: f32,
    /// Overshoot factor over the baseline needed for a beat
    pub threshold: f32,
    /// Minimum frames between two beats (~100ms at 60 Hz)
    pub refractory_frames: u32,
    /// Frames during which beats are suppressed while the baseline settles
    pub warmup_frames: u32,
    /// Bass energy below this never counts as a beat
    pub min_energy: f32,
}

impl Default for BeatDetectorConfig {
    fn default() -> Self {
        Self {
            decay: 0.95,
            threshold: 1.3,
            refractory_frames: 6,
            warmup_frames: 10,
            min_energy: 0.01,
        }
    }
}

impl BeatDetectorConfig {
    /// Reject configurations the detector can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.decay) {
            return Err(ConfigError::Invalid(format!(
                "beat decay must be in [0, 1), got {}",
                self.decay
            )));
        }
        if !self.threshold.is_finite() || self.threshold < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "beat threshold must be >= 1.0, got {}",
                self.threshold
            )));
        }
        if !self.min_energy.is_finite() || self.min_energy < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "beat min_energy must be >= 0.0, got {}",
                self.min_energy
            )));
        }
        Ok(())
    }
}

/// Beat event for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BeatInfo {
    /// True only on the frame the beat was detected
    pub is_beat: bool,
    /// Normalized bass overshoot (0.0 - 1.0)
    pub strength: f32,
    /// Normalized overshoot of every band against its own baseline
    pub band_strengths: BandEnergy,
}

/// Edge-triggered beat detector
#[derive(Debug, Clone)]
pub struct BeatDetector {
    config: BeatDetectorConfig,
    /// Moving average of bass energy (None until the first frame seeds it)
    running_average: Option<f32>,
    /// Moving average of every band, for band strengths
    band_averages: Option<BandEnergy>,
    /// Frames since the last flagged beat
    frames_since_last_beat: u32,
    /// Frames seen since creation or reset
    frames_seen: u64,
    /// Beats flagged since creation or reset
    beat_count: u64,
}

impl BeatDetector {
    /// Create a detector with the given configuration
    pub fn new(config: BeatDetectorConfig) -> Self {
        debug!(
            "BeatDetector created: decay={}, threshold={}, refractory={} frames, warmup={} frames",
            config.decay, config.threshold, config.refractory_frames, config.warmup_frames
        );
        let frames_since_last_beat = config.refractory_frames; // Start ready for beat
        Self {
            config,
            running_average: None,
            band_averages: None,
            frames_since_last_beat,
            frames_seen: 0,
            beat_count: 0,
        }
    }

    /// Feed one frame of band energies.
    ///
    /// Must be called with the same energies the extractor produced this frame.
    pub fn update(&mut self, bands: &BandEnergy) -> BeatInfo {
        let bands = BandEnergy::from_fn(|band| sanitize(bands.get(band)));
        let instant = bands.bass;

        self.frames_seen += 1;
        self.frames_since_last_beat = self.frames_since_last_beat.saturating_add(1);

        // The first frame seeds the baseline so a steady signal never overshoots it
        let baseline = *self.running_average.get_or_insert(instant);
        let band_baseline = *self.band_averages.get_or_insert(bands);

        let gate = self.config.min_energy;
        let strength = overshoot(instant, baseline, gate);
        let band_strengths =
            BandEnergy::from_fn(|band| overshoot(bands.get(band), band_baseline.get(band), gate));

        let warmed_up = self.frames_seen > self.config.warmup_frames as u64;
        let is_beat = warmed_up
            && instant >= self.config.min_energy
            && instant > baseline * self.config.threshold
            && self.frames_since_last_beat >= self.config.refractory_frames;

        // Baseline follows the raw value every frame, beat or not
        let decay = self.config.decay;
        self.running_average = Some(baseline * decay + instant * (1.0 - decay));
        self.band_averages = Some(BandEnergy::from_fn(|band| {
            band_baseline.get(band) * decay + bands.get(band) * (1.0 - decay)
        }));

        if is_beat {
            self.frames_since_last_beat = 0;
            self.beat_count += 1;
            trace!(
                "Beat #{} at frame {}: bass={:.3} baseline={:.3} strength={:.2}",
                self.beat_count,
                self.frames_seen,
                instant,
                baseline,
                strength
            );
        }

        BeatInfo {
            is_beat,
            strength,
            band_strengths,
        }
    }

    /// Clear all rolling state
    pub fn reset(&mut self) {
        self.running_average = None;
        self.band_averages = None;
        self.frames_since_last_beat = self.config.refractory_frames;
        self.frames_seen = 0;
        self.beat_count = 0;
        debug!("BeatDetector reset");
    }

    /// Current bass baseline
    pub fn running_average(&self) -> f32 {
        self.running_average.unwrap_or(0.0)
    }

    /// Frames since the last beat
    pub fn frames_since_last_beat(&self) -> u32 {
        self.frames_since_last_beat
    }

    /// Beats detected so far
    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    /// Active configuration
    pub fn config(&self) -> &BeatDetectorConfig {
        &self.config
    }

    /// Strength of a single band for a given frame result
    pub fn band_strength(info: &BeatInfo, band: FrequencyBand) -> f32 {
        info.band_strengths.get(band)
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(BeatDetectorConfig::default())
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// `(instant - average) / average` clamped to [0, 1].
///
/// Against a silent baseline only energy at or above `gate` registers, at full strength.
fn overshoot(instant: f32, average: f32, gate: f32) -> f32 {
    if average <= f32::EPSILON {
        let audible = instant > f32::EPSILON && instant >= gate;
        return if audible { 1.0 } else { 0.0 };
    }
    ((instant - average) / average).clamp(0.0, 1.0)
}
