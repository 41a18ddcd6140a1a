//! SpectraSync Core - Real-time audio/lyrics synchronization engine
//!
//! This crate contains everything that runs inside the per-frame callback:
//! - Audio feature extraction and band energies
//! - Beat detection and tempo estimation
//! - Lyrics synchronization against the playback clock
//! - The visual effect contract, registry and dispatcher
//! - The frame scheduler tying it together

#![warn(missing_docs)]

pub use glam::{Quat, Vec3};
use thiserror::Error;

pub mod audio;
pub mod config;
pub mod effects;
pub mod logging;
pub mod lyrics;
pub mod scene;
pub mod scheduler;
pub mod session;

// --- Re-exports grouped by category ---

// Audio
pub use audio::{
    AudioFeatureExtractor, AudioFeed, BandEnergy, BandLayout, BeatDetector, BeatDetectorConfig,
    BeatInfo, FeatureSummary, FrequencyBand, NoAudio, PcmAudioFeed, SpectrumAnalyzer,
    SpectrumConfig, TempoEstimator,
};

// Lyrics
pub use lyrics::{
    parse_srt, LyricsConfig, LyricsData, LyricsError, LyricsSegment, LyricsState,
    LyricsSubscription, LyricsSynchronizer, SubscriptionId, WordTimestamp,
};

// Effects & Scene
pub use effects::{
    DispatcherState, EffectDispatcher, EffectError, EffectParams, EffectRegistry, FrameInput,
    ModuleInstance, ParamKey, ParamValue, VisualEffect,
};
pub use scene::{Camera, MemoryScene, ObjectId, ObjectKind, Scene, SceneError, SceneObject};

// Frame loop
pub use scheduler::{FrameOutput, FrameScheduler};
pub use session::{SessionFrame, VisualizerSession};

// Config & Logging
pub use config::{ConfigError, EngineConfig};
pub use logging::LogConfig;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Effect activation failed
    #[error(transparent)]
    Effect(#[from] EffectError),

    /// Lyrics could not be loaded
    #[error(transparent)]
    Lyrics(#[from] LyricsError),

    /// Scene operation failed
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Audio source could not be constructed
    #[error("Invalid audio source: {0}")]
    InvalidAudio(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
