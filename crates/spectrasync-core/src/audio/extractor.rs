//! Per-frame feature extraction from an [`AudioFeed`].

use super::{AudioFeed, BandLayout, FeatureSummary};
use std::sync::Arc;
use tracing::{debug, trace};

/// Pulls spectrum and waveform data once per frame and summarizes it
#[derive(Debug, Clone)]
pub struct AudioFeatureExtractor {
    /// Number of bins per summary (fixed for the extractor's lifetime)
    bin_count: usize,
    /// Band boundaries
    layout: BandLayout,
    /// Frames pulled so far
    frames_pulled: u64,
    /// Frames pulled while the feed was not ready
    silent_frames: u64,
}

impl AudioFeatureExtractor {
    /// Create an extractor with the default band layout
    pub fn new(bin_count: usize) -> Self {
        Self::with_layout(bin_count, BandLayout::default())
    }

    /// Create an extractor with a custom band layout
    pub fn with_layout(bin_count: usize, layout: BandLayout) -> Self {
        debug!("AudioFeatureExtractor created: bin_count={}", bin_count);
        Self {
            bin_count,
            layout,
            frames_pulled: 0,
            silent_frames: 0,
        }
    }

    /// Read the feed and build this frame's summary.
    ///
    /// Never fails: a feed that isn't ready yields an all-zero summary.
    pub fn pull(&mut self, feed: &mut dyn AudioFeed) -> Arc<FeatureSummary> {
        self.frames_pulled += 1;

        if !feed.is_ready() {
            self.silent_frames += 1;
            if self.silent_frames == 1 {
                debug!("Audio feed not ready, emitting silent frames");
            }
            return Arc::new(FeatureSummary::silent(self.bin_count));
        }
        if self.silent_frames > 0 {
            debug!("Audio feed ready after {} silent frames", self.silent_frames);
            self.silent_frames = 0;
        }

        let mut frequency_bins = vec![0u8; self.bin_count];
        feed.frequency_data(&mut frequency_bins);

        let mut time_domain = vec![0u8; self.bin_count];
        feed.time_domain_data(&mut time_domain);

        let band_energy = self.layout.measure(&frequency_bins);

        if self.frames_pulled % 600 == 0 {
            trace!(
                "Extractor frame #{}: bass={:.3} mid={:.3} treble={:.3}",
                self.frames_pulled,
                band_energy.bass,
                band_energy.mid,
                band_energy.treble
            );
        }

        Arc::new(FeatureSummary {
            frequency_bins,
            time_domain,
            band_energy,
        })
    }

    /// Bins per summary
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Band layout in use
    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    /// Frames pulled so far
    pub fn frames_pulled(&self) -> u64 {
        self.frames_pulled
    }
}
