//! Engine configuration.
//!
//! Every section has sensible defaults, so a partial file (or none at all)
//! still produces a runnable engine.

use crate::audio::{BandLayout, BeatDetectorConfig, SpectrumConfig};
use crate::effects::EffectParams;
use crate::logging::LogConfig;
use crate::lyrics::LyricsConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// File could not be read or written
    #[error("Config I/O error for {path:?}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON parse/serialize failure
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse failure
    #[error("Config TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialize failure
    #[error("Config TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

/// File formats the config can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frequency bins per frame
    pub bin_count: usize,
    /// Band boundaries as fractions of the bin array
    pub band_layout: BandLayout,
    /// Beat detector thresholds
    pub beat: BeatDetectorConfig,
    /// Lyrics synchronizer settings
    pub lyrics: LyricsConfig,
    /// Frame rate of the offline loop
    pub target_fps: f32,
    /// Effect activated at startup
    pub default_effect: String,
    /// Initial effect parameters
    pub params: EffectParams,
    /// Logging
    pub log: LogConfig,
    /// Spectrum analyser scaling for PCM feeds
    pub spectrum: SpectrumConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bin_count: 1024,
            band_layout: BandLayout::default(),
            beat: BeatDetectorConfig::default(),
            lyrics: LyricsConfig::default(),
            target_fps: 60.0,
            default_effect: "pulse-sphere".to_string(),
            params: EffectParams::default(),
            log: LogConfig::default(),
            spectrum: SpectrumConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Default location in the user config directory
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("SpectraSync");
            p.push("config.toml");
            p
        })
    }

    /// [`load_from`](Self::load_from), with a missing file reported as `Ok(None)`.
    ///
    /// Meant for [`config_path`](Self::config_path): a file that exists but
    /// fails to parse or validate is an error, and the caller decides whether
    /// to fall back to defaults.
    pub fn load_if_exists(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {:?}", path);
            return Ok(None);
        }
        Self::load_from(path).map(Some)
    }

    /// Load and validate a `.toml` or `.json` file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = match Format::of(path) {
            Format::Toml => toml::from_str(&content)?,
            Format::Json => serde_json::from_str(&content)?,
        };
        config.validate()?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Write to a `.toml` or `.json` file, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = match Format::of(path) {
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };
        fs::write(path, content).map_err(io_err)?;
        debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bin_count == 0 {
            return Err(ConfigError::Invalid("bin_count must be > 0".into()));
        }
        if !self.target_fps.is_finite() || self.target_fps <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "target_fps must be > 0, got {}",
                self.target_fps
            )));
        }
        if self.lyrics.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "lyrics.channel_capacity must be > 0".into(),
            ));
        }
        let spectrum = &self.spectrum;
        if !(0.0..=1.0).contains(&spectrum.smoothing) {
            return Err(ConfigError::Invalid(format!(
                "spectrum.smoothing must be in [0, 1], got {}",
                spectrum.smoothing
            )));
        }
        if spectrum.min_decibels >= spectrum.max_decibels {
            return Err(ConfigError::Invalid(format!(
                "spectrum.min_decibels ({}) must be below max_decibels ({})",
                spectrum.min_decibels, spectrum.max_decibels
            )));
        }
        self.beat.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            target_fps = 30.0
            default_effect = "waveform-ring"

            [beat]
            threshold = 1.5

            [params]
            rotationSpeed = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(config.target_fps, 30.0);
        assert_eq!(config.beat.threshold, 1.5);
        assert_eq!(config.beat.decay, 0.95);
        assert_eq!(config.bin_count, 1024);
        assert_eq!(config.params.rotation_speed, Some(2.0));
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = EngineConfig::default();
        config.bin_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.beat.threshold = 0.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.spectrum.min_decibels = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.default_effect = "spectrum-bars".into();
        config.params.set("intensity", 0.25);
        config.lyrics.word_highlighting = false;

        for name in ["nested/engine.toml", "engine.json"] {
            let path = dir.path().join(name);
            config.save_to(&path).unwrap();
            let loaded = EngineConfig::load_from(&path).unwrap();
            assert_eq!(loaded, config, "round trip through {}", name);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load_from(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(EngineConfig::load_if_exists(&path).unwrap().is_none());

        fs::write(&path, "target_fps = [").unwrap();
        assert!(matches!(
            EngineConfig::load_if_exists(&path),
            Err(ConfigError::TomlParse(_))
        ));

        fs::write(&path, "target_fps = 24.0").unwrap();
        let config = EngineConfig::load_if_exists(&path).unwrap().unwrap();
        assert_eq!(config.target_fps, 24.0);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"target_fps": -1}"#).unwrap();
        assert!(matches!(
            EngineConfig::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));
    }
}
