//! Per-frame pass: extract features, detect beats, animate the active effect.

use crate::audio::{
    AudioFeatureExtractor, AudioFeed, BeatDetector, BeatInfo, FeatureSummary, TempoEstimator,
};
use crate::config::EngineConfig;
use crate::effects::{EffectDispatcher, EffectRegistry};
use crate::scene::{Camera, Scene};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutput {
    /// Features handed to the active effect
    pub features: Arc<FeatureSummary>,
    /// Beat result for this frame
    pub beat: BeatInfo,
    /// Tempo estimate, once enough beats were seen
    pub tempo_bpm: Option<f32>,
    /// Frame counter, starting at 0
    pub frame_index: u64,
}

/// Owns the audio pipeline and the dispatcher and runs them in fixed order
#[derive(Debug)]
pub struct FrameScheduler {
    extractor: AudioFeatureExtractor,
    detector: BeatDetector,
    tempo: TempoEstimator,
    dispatcher: EffectDispatcher,
    frame_index: u64,
}

impl FrameScheduler {
    /// Assemble a scheduler from its parts
    pub fn new(
        extractor: AudioFeatureExtractor,
        detector: BeatDetector,
        dispatcher: EffectDispatcher,
    ) -> Self {
        Self {
            extractor,
            detector,
            tempo: TempoEstimator::new(),
            dispatcher,
            frame_index: 0,
        }
    }

    /// Build from configuration; effect parameters are copied into the dispatcher
    pub fn from_config(config: &EngineConfig, registry: EffectRegistry) -> Self {
        let mut dispatcher = EffectDispatcher::new(registry);
        dispatcher.set_params(config.params.clone());
        Self::new(
            AudioFeatureExtractor::with_layout(config.bin_count, config.band_layout.clone()),
            BeatDetector::new(config.beat.clone()),
            dispatcher,
        )
    }

    /// Run one frame.
    ///
    /// `elapsed` is the playback time in seconds; it drives effect animation
    /// and the tempo estimate.
    pub fn tick(
        &mut self,
        feed: &mut dyn AudioFeed,
        scene: &mut dyn Scene,
        camera: Option<&mut Camera>,
        elapsed: f64,
    ) -> FrameOutput {
        let features = self.extractor.pull(feed);
        let beat = self.detector.update(&features.band_energy);

        let tempo_bpm = if beat.is_beat {
            let bpm = self.tempo.record_beat(elapsed);
            trace!(
                "Frame {}: beat strength={:.2} bpm={:?}",
                self.frame_index,
                beat.strength,
                bpm
            );
            bpm
        } else {
            self.tempo.bpm()
        };

        self.dispatcher
            .animate(scene, &features, elapsed, Some(&beat), camera);

        let output = FrameOutput {
            features,
            beat,
            tempo_bpm,
            frame_index: self.frame_index,
        };
        self.frame_index += 1;
        output
    }

    /// Clear detector, tempo and frame counter; the active effect stays
    pub fn reset(&mut self) {
        self.detector.reset();
        self.tempo.reset();
        self.frame_index = 0;
        debug!("FrameScheduler reset");
    }

    /// Frames run so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Active effect control
    pub fn dispatcher(&self) -> &EffectDispatcher {
        &self.dispatcher
    }

    /// Active effect control, for switching effects and setting parameters
    pub fn dispatcher_mut(&mut self) -> &mut EffectDispatcher {
        &mut self.dispatcher
    }

    /// Beat detector
    pub fn detector(&self) -> &BeatDetector {
        &self.detector
    }

    /// Feature extractor
    pub fn extractor(&self) -> &AudioFeatureExtractor {
        &self.extractor
    }

    /// Tempo estimator
    pub fn tempo(&self) -> &TempoEstimator {
        &self.tempo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NoAudio;
    use crate::scene::MemoryScene;

    #[test]
    fn test_no_audio_frame() {
        let mut scheduler =
            FrameScheduler::from_config(&EngineConfig::default(), EffectRegistry::with_builtin());
        let mut scene = MemoryScene::new();
        let out = scheduler.tick(&mut NoAudio, &mut scene, None, 0.0);
        assert_eq!(out.frame_index, 0);
        assert_eq!(out.features.bin_count(), 1024);
        assert!(!out.beat.is_beat);
        assert_eq!(out.tempo_bpm, None);
        assert_eq!(scheduler.frame_index(), 1);
    }

    #[test]
    fn test_reset_clears_counters() {
        let mut scheduler =
            FrameScheduler::from_config(&EngineConfig::default(), EffectRegistry::with_builtin());
        let mut scene = MemoryScene::new();
        scheduler
            .dispatcher_mut()
            .activate("pulse-sphere", &mut scene)
            .unwrap();
        for i in 0..5 {
            scheduler.tick(&mut NoAudio, &mut scene, None, i as f64 / 60.0);
        }
        scheduler.reset();
        assert_eq!(scheduler.frame_index(), 0);
        assert_eq!(scheduler.dispatcher().active_id(), Some("pulse-sphere"));
    }
}
