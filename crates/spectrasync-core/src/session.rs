//! A running visualizer: effects and lyrics driven by one playback clock.

use crate::audio::AudioFeed;
use crate::config::EngineConfig;
use crate::effects::{EffectError, EffectRegistry};
use crate::lyrics::{LyricsData, LyricsState, LyricsSubscription, LyricsSynchronizer};
use crate::scene::{Camera, Scene};
use crate::scheduler::{FrameOutput, FrameScheduler};
use std::time::Instant;
use tracing::info;

/// One frame of session output
#[derive(Debug, Clone)]
pub struct SessionFrame {
    /// Playback time this frame was computed for
    pub playback_time: f64,
    /// Audio and beat results
    pub output: FrameOutput,
    /// Lyrics state at `playback_time`
    pub lyrics: LyricsState,
}

/// Frame scheduler plus lyrics synchronizer sharing one clock
#[derive(Debug)]
pub struct VisualizerSession {
    scheduler: FrameScheduler,
    lyrics: LyricsSynchronizer,
}

impl VisualizerSession {
    /// Build from configuration
    pub fn from_config(config: &EngineConfig, registry: EffectRegistry) -> Self {
        Self {
            scheduler: FrameScheduler::from_config(config, registry),
            lyrics: LyricsSynchronizer::new(config.lyrics.clone()),
        }
    }

    /// Replace the lyrics for the current track
    pub fn load_lyrics(&mut self, data: LyricsData) {
        let segments = data.into_segments();
        info!("Session: loaded {} lyric segments", segments.len());
        self.lyrics.load(segments);
    }

    /// Switch the active effect
    pub fn activate(&mut self, id: &str, scene: &mut dyn Scene) -> Result<(), EffectError> {
        self.scheduler.dispatcher_mut().activate(id, scene)
    }

    /// Subscribe to lyric changes
    pub fn subscribe_lyrics(&mut self) -> LyricsSubscription {
        self.lyrics.subscribe()
    }

    /// Run one frame at the feed's current playback time
    pub fn frame(
        &mut self,
        feed: &mut dyn AudioFeed,
        scene: &mut dyn Scene,
        camera: Option<&mut Camera>,
    ) -> SessionFrame {
        self.frame_at(feed, scene, camera, Instant::now())
    }

    /// [`frame`](Self::frame) with an explicit wall clock for the lyric throttle
    pub fn frame_at(
        &mut self,
        feed: &mut dyn AudioFeed,
        scene: &mut dyn Scene,
        camera: Option<&mut Camera>,
        now: Instant,
    ) -> SessionFrame {
        // Read once so effects and lyrics agree on the time
        let playback_time = feed.current_time();
        let output = self.scheduler.tick(feed, scene, camera, playback_time);
        let lyrics = self.lyrics.update_at(playback_time, now).clone();
        SessionFrame {
            playback_time,
            output,
            lyrics,
        }
    }

    /// Release the active effect and clear rolling audio state
    pub fn stop(&mut self, scene: &mut dyn Scene) {
        self.scheduler.dispatcher_mut().deactivate(scene);
        self.scheduler.reset();
    }

    /// Frame scheduler
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Frame scheduler, for effect control
    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }

    /// Lyrics synchronizer
    pub fn lyrics(&self) -> &LyricsSynchronizer {
        &self.lyrics
    }

    /// Lyrics synchronizer, mutable
    pub fn lyrics_mut(&mut self) -> &mut LyricsSynchronizer {
        &mut self.lyrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NoAudio;
    use crate::lyrics::LyricsSegment;
    use crate::scene::MemoryScene;

    struct Clock(f64);

    impl AudioFeed for Clock {
        fn is_ready(&self) -> bool {
            false
        }
        fn frequency_data(&mut self, _out: &mut [u8]) {}
        fn time_domain_data(&mut self, _out: &mut [u8]) {}
        fn current_time(&self) -> f64 {
            self.0
        }
    }

    fn default_session() -> VisualizerSession {
        VisualizerSession::from_config(&EngineConfig::default(), EffectRegistry::with_builtin())
    }

    #[test]
    fn test_lyrics_follow_feed_clock() {
        let mut session = default_session();
        session.load_lyrics(LyricsData {
            segments: vec![
                LyricsSegment::new("Hello", 0.0, 2.0),
                LyricsSegment::new("World", 2.0, 4.0),
            ],
            ..LyricsData::default()
        });
        let mut scene = MemoryScene::new();

        let frame = session.frame(&mut Clock(3.0), &mut scene, None);
        assert_eq!(frame.playback_time, 3.0);
        assert_eq!(frame.lyrics.current_line, "World");

        let frame = session.frame(&mut NoAudio, &mut scene, None);
        assert_eq!(frame.lyrics.current_line, "Hello");
    }

    #[test]
    fn test_stop_releases_effect() {
        let mut session = default_session();
        let mut scene = MemoryScene::new();
        session.activate("waveform-ring", &mut scene).unwrap();
        assert!(!scene.is_empty());
        session.stop(&mut scene);
        assert!(scene.is_empty());
    }
}
