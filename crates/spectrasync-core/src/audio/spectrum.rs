//! PCM-backed audio feed with an FFT spectrum analyser
//!
//! Turns decoded samples into the byte frequency/time-domain data the
//! extractor expects, using the same scaling a browser `AnalyserNode` applies:
//! smoothed linear magnitudes converted to decibels and mapped onto 0-255
//! between `min_decibels` and `max_decibels`.

use super::AudioFeed;
use crate::CoreError;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Analyser scaling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Smoothing between successive spectra (0.0 - 1.0)
    pub smoothing: f32,
    /// Level mapped to byte 0
    pub min_decibels: f32,
    /// Level mapped to byte 255
    pub max_decibels: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

/// FFT analyser producing byte spectra
pub struct SpectrumAnalyzer {
    /// FFT instance
    fft: Arc<dyn Fft<f32>>,

    /// Configuration
    config: SpectrumConfig,

    /// Output bins (half the FFT size)
    bin_count: usize,

    /// Hann window coefficients
    window: Vec<f32>,

    /// FFT complex buffer
    fft_buffer: Vec<Complex<f32>>,

    /// FFT scratch buffer
    scratch_buffer: Vec<Complex<f32>>,

    /// Smoothed magnitude buffer
    smoothed_magnitudes: Vec<f32>,
}

impl SpectrumAnalyzer {
    /// Create an analyser producing `bin_count` bins (FFT size is twice that)
    pub fn new(bin_count: usize, config: SpectrumConfig) -> Self {
        let bin_count = bin_count.max(1);
        let fft_size = bin_count * 2;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        // Pre-compute Hann window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let t = i as f32 / (fft_size - 1) as f32;
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * t).cos())
            })
            .collect();

        debug!(
            "SpectrumAnalyzer created: fft_size={}, bins={}, smoothing={}",
            fft_size, bin_count, config.smoothing
        );

        Self {
            fft,
            config,
            bin_count,
            window,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch_buffer: vec![Complex::new(0.0, 0.0); scratch_len],
            smoothed_magnitudes: vec![0.0; bin_count],
        }
    }

    /// FFT window length in samples
    pub fn fft_size(&self) -> usize {
        self.bin_count * 2
    }

    /// Output bins
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Analyse the most recent `fft_size` samples and write byte magnitudes.
    ///
    /// Shorter inputs are zero-padded at the front; non-finite samples count
    /// as silence.
    pub fn analyze(&mut self, samples: &[f32], out: &mut [u8]) {
        let fft_size = self.fft_size();
        let take = samples.len().min(fft_size);
        let recent = &samples[samples.len() - take..];
        let pad = fft_size - take;

        for i in 0..fft_size {
            let sample = if i < pad { 0.0 } else { recent[i - pad] };
            let sample = if sample.is_finite() { sample } else { 0.0 };
            self.fft_buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch_buffer);

        let norm_factor = 1.0 / fft_size as f32;
        let smoothing = self.config.smoothing.clamp(0.0, 1.0);
        let db_range = (self.config.max_decibels - self.config.min_decibels).max(f32::EPSILON);

        for i in 0..self.bin_count {
            let magnitude = self.fft_buffer[i].norm() * norm_factor;
            self.smoothed_magnitudes[i] =
                self.smoothed_magnitudes[i] * smoothing + magnitude * (1.0 - smoothing);

            if let Some(slot) = out.get_mut(i) {
                let db = 20.0 * self.smoothed_magnitudes[i].max(1e-12).log10();
                let scaled = 255.0 * (db - self.config.min_decibels) / db_range;
                *slot = scaled.clamp(0.0, 255.0) as u8;
            }
        }
    }

    /// Write the most recent samples as bytes (128 = silence)
    pub fn time_domain(samples: &[f32], out: &mut [u8]) {
        let take = samples.len().min(out.len());
        let recent = &samples[samples.len() - take..];
        let pad = out.len() - take;
        for (i, slot) in out.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { recent[i - pad] };
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *slot = (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8;
        }
    }

    /// Clear smoothing history
    pub fn reset(&mut self) {
        self.smoothed_magnitudes.fill(0.0);
    }
}

/// Audio feed over a fully decoded mono track with its own playback clock
pub struct PcmAudioFeed {
    /// Mono samples
    samples: Vec<f32>,
    /// Samples per second
    sample_rate: u32,
    /// Playback position in seconds
    position: f64,
    /// Whether `advance` moves the clock
    playing: bool,
    /// Analyser for the frequency data
    analyzer: SpectrumAnalyzer,
}

impl PcmAudioFeed {
    /// Create a paused feed positioned at 0
    pub fn new(
        samples: Vec<f32>,
        sample_rate: u32,
        bin_count: usize,
        config: SpectrumConfig,
    ) -> Result<Self, CoreError> {
        if sample_rate == 0 {
            return Err(CoreError::InvalidAudio(
                "sample rate must be > 0".to_string(),
            ));
        }
        debug!(
            "PcmAudioFeed created: {} samples @ {}Hz ({:.1}s)",
            samples.len(),
            sample_rate,
            samples.len() as f64 / sample_rate as f64
        );
        Ok(Self {
            samples,
            sample_rate,
            position: 0.0,
            playing: false,
            analyzer: SpectrumAnalyzer::new(bin_count, config),
        })
    }

    /// Mix interleaved multichannel samples down to mono
    pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
        let channels = channels.max(1) as usize;
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Pause playback, keeping the position
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Stop playback and rewind
    pub fn stop(&mut self) {
        self.playing = false;
        self.position = 0.0;
        self.analyzer.reset();
    }

    /// Whether the clock is running
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Jump to `seconds`, clamped to the track
    pub fn seek(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        self.position = seconds.clamp(0.0, self.duration());
    }

    /// Advance the clock by `dt` seconds if playing; stops at the end of the track
    pub fn advance(&mut self, dt: f64) {
        if !self.playing || !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.position = (self.position + dt).min(self.duration());
        if self.is_finished() {
            self.playing = false;
            debug!("PcmAudioFeed reached end of track");
        }
    }

    /// Track length in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Whether the clock reached the end of the track
    pub fn is_finished(&self) -> bool {
        self.position >= self.duration()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Index range of the samples feeding the analyser, ending at the playback position
    fn history_range(&self) -> Range<usize> {
        let end = ((self.position * self.sample_rate as f64) as usize).min(self.samples.len());
        let start = end.saturating_sub(self.analyzer.fft_size());
        start..end
    }
}

impl AudioFeed for PcmAudioFeed {
    fn is_ready(&self) -> bool {
        !self.samples.is_empty()
    }

    fn frequency_data(&mut self, out: &mut [u8]) {
        let range = self.history_range();
        self.analyzer.analyze(&self.samples[range], out);
    }

    fn time_domain_data(&mut self, out: &mut [u8]) {
        let range = self.history_range();
        SpectrumAnalyzer::time_domain(&self.samples[range], out);
    }

    fn current_time(&self) -> f64 {
        self.position
    }
}
