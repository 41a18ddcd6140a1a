//! Tempo estimation from beat timestamps.

use std::collections::VecDeque;
use tracing::debug;

/// Beats kept for the estimate
const MAX_BEATS: usize = 16;

/// Beats required before an estimate is produced
const MIN_BEATS: usize = 4;

/// Estimates BPM from the spacing of recent beats
#[derive(Debug, Clone, Default)]
pub struct TempoEstimator {
    /// Timestamps (seconds) of the most recent beats
    beat_times: VecDeque<f64>,
    /// Last computed estimate
    bpm: Option<f32>,
}

impl TempoEstimator {
    /// Create an empty estimator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a beat at `timestamp` seconds of playback.
    ///
    /// A timestamp at or before the previous one means the track was seeked
    /// backwards; the history is discarded.
    pub fn record_beat(&mut self, timestamp: f64) -> Option<f32> {
        if !timestamp.is_finite() {
            return self.bpm;
        }
        if self.beat_times.back().is_some_and(|&last| timestamp <= last) {
            debug!("TempoEstimator: playback moved backwards, clearing history");
            self.reset();
        }

        self.beat_times.push_back(timestamp);
        if self.beat_times.len() > MAX_BEATS {
            self.beat_times.pop_front();
        }

        self.bpm = self.estimate();
        self.bpm
    }

    /// Current estimate
    pub fn bpm(&self) -> Option<f32> {
        self.bpm
    }

    /// Number of beats in the history
    pub fn beat_count(&self) -> usize {
        self.beat_times.len()
    }

    /// Forget all beats
    pub fn reset(&mut self) {
        self.beat_times.clear();
        self.bpm = None;
    }

    fn estimate(&self) -> Option<f32> {
        if self.beat_times.len() < MIN_BEATS {
            return None;
        }
        let times: Vec<f64> = self.beat_times.iter().copied().collect();
        let mut gaps: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();

        let period = interquartile_mean(&mut gaps)?;
        if period <= MIN_PERIOD {
            return None;
        }
        let bpm = fold_tempo((60.0 / period) as f32)?;
        Some((bpm * 10.0).round() / 10.0)
    }
}

/// Shortest beat period considered (seconds)
const MIN_PERIOD: f64 = 0.001;

/// Mean of `values` without the lowest and highest quarter; sorts in place
fn interquartile_mean(values: &mut [f64]) -> Option<f64> {
    values.sort_by(f64::total_cmp);
    let cut = if values.len() >= 4 { values.len() / 4 } else { 0 };
    let kept = &values[cut..values.len() - cut];
    if kept.is_empty() {
        return None;
    }
    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

/// Bring octave errors into 60-200 BPM; anything further out is rejected
fn fold_tempo(bpm: f32) -> Option<f32> {
    match bpm {
        b if (60.0..=200.0).contains(&b) => Some(b),
        b if (200.0..=400.0).contains(&b) => Some(b / 2.0),
        b if (30.0..60.0).contains(&b) => Some(b * 2.0),
        _ => None,
    }
}
