//! Audio feature extraction, beat detection and the audio feed seam.

pub mod bands;
pub mod beat;
pub mod extractor;
pub mod spectrum;
pub mod tempo;

pub use bands::{BandEnergy, BandLayout, BandRange, FrequencyBand, MAX_SAMPLE_VALUE};
pub use beat::{BeatDetector, BeatDetectorConfig, BeatInfo};
pub use extractor::AudioFeatureExtractor;
pub use spectrum::{PcmAudioFeed, SpectrumAnalyzer, SpectrumConfig};
pub use tempo::TempoEstimator;

use serde::Serialize;

/// Live audio source read once per frame.
///
/// Implementations only copy already-buffered data; they must never block on
/// decoding, disk or network.
pub trait AudioFeed {
    /// Whether audio is loaded and samples are available
    fn is_ready(&self) -> bool;

    /// Fill `out` with byte-scaled frequency magnitudes.
    ///
    /// `out` arrives zeroed; feeds with fewer bins leave the tail untouched.
    fn frequency_data(&mut self, out: &mut [u8]);

    /// Fill `out` with byte-scaled time-domain samples (128 = silence)
    fn time_domain_data(&mut self, out: &mut [u8]);

    /// Playback position in seconds
    fn current_time(&self) -> f64;
}

/// Feed used when no track is loaded
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAudio;

impl AudioFeed for NoAudio {
    fn is_ready(&self) -> bool {
        false
    }

    fn frequency_data(&mut self, _out: &mut [u8]) {}

    fn time_domain_data(&mut self, _out: &mut [u8]) {}

    fn current_time(&self) -> f64 {
        0.0
    }
}

/// Per-frame audio summary handed to every active effect
///
/// Created once per frame by [`AudioFeatureExtractor::pull`] and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    /// Byte frequency spectrum (N bins)
    pub frequency_bins: Vec<u8>,
    /// Byte waveform (N samples)
    pub time_domain: Vec<u8>,
    /// Normalized band energies
    pub band_energy: BandEnergy,
}

impl FeatureSummary {
    /// An all-zero summary of `bin_count` bins
    pub fn silent(bin_count: usize) -> Self {
        Self {
            frequency_bins: vec![0; bin_count],
            time_domain: vec![0; bin_count],
            band_energy: BandEnergy::default(),
        }
    }

    /// Number of bins
    pub fn bin_count(&self) -> usize {
        self.frequency_bins.len()
    }

    /// Frequency bin normalized to [0, 1]; out-of-range indices read as 0
    pub fn bin(&self, index: usize) -> f32 {
        self.frequency_bins
            .get(index)
            .map(|&b| b as f32 / MAX_SAMPLE_VALUE)
            .unwrap_or(0.0)
    }

    /// Waveform sample mapped to [-1, 1]; out-of-range indices read as 0
    pub fn waveform(&self, index: usize) -> f32 {
        self.time_domain
            .get(index)
            .map(|&b| (b as f32 - 128.0) / 128.0)
            .unwrap_or(0.0)
    }
}
