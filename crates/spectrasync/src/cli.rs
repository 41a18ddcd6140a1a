//! Command-line argument parsing.

use clap::Parser;
use spectrasync_core::{EngineConfig, ParamValue};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "SpectraSync")]
#[command(about = "Audio-reactive visuals synchronized with lyrics", long_about = None)]
pub struct Args {
    /// WAV file to analyze; without it the engine runs on silence
    #[arg(long, value_name = "WAV")]
    pub audio: Option<PathBuf>,

    /// Lyrics file (.json transcription or .srt subtitles)
    #[arg(long, value_name = "FILE")]
    pub lyrics: Option<PathBuf>,

    /// Effect to activate (see --list-effects)
    #[arg(long, value_name = "ID")]
    pub effect: Option<String>,

    /// Frames per second
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Seconds to run when no audio is given
    #[arg(long, value_name = "SECONDS", default_value = "10")]
    pub duration: f64,

    /// Configuration file (.toml or .json); defaults to the user config directory
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the effective configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    pub write_config: Option<PathBuf>,

    /// Effect parameter override, e.g. `--param intensity=1.5 --param colorCycle=true`
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Pace frames against the wall clock instead of running as fast as possible
    #[arg(long)]
    pub realtime: bool,

    /// Print the registered effects and exit
    #[arg(long)]
    pub list_effects: bool,
}

impl Args {
    /// Fold command-line overrides into the loaded configuration
    pub fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(effect) = &self.effect {
            config.default_effect = effect.clone();
        }
        if let Some(fps) = self.fps {
            config.target_fps = fps;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        for raw in &self.params {
            match parse_param(raw) {
                Some((key, value)) => {
                    if !config.params.set(key, value) {
                        eprintln!("Warning: Unknown effect parameter '{}', ignored", key);
                    }
                }
                None => eprintln!("Warning: Expected KEY=VALUE, got '{}'", raw),
            }
        }
    }
}

/// Split `key=value` and read the value as a flag or a number
fn parse_param(raw: &str) -> Option<(&str, ParamValue)> {
    let (key, value) = raw.split_once('=')?;
    let value = value.trim();
    let parsed = match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => ParamValue::Flag(true),
        "false" | "off" | "no" => ParamValue::Flag(false),
        _ => ParamValue::Number(value.parse().ok()?),
    };
    Some((key.trim(), parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectrasync_core::ParamKey;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("intensity=1.5"),
            Some(("intensity", ParamValue::Number(1.5)))
        );
        assert_eq!(
            parse_param(" colorCycle = on"),
            Some(("colorCycle", ParamValue::Flag(true)))
        );
        assert_eq!(parse_param("intensity"), None);
        assert_eq!(parse_param("intensity=loud"), None);
    }

    #[test]
    fn test_overrides_reach_config() {
        let args = Args::parse_from([
            "SpectraSync",
            "--effect",
            "spectrum-bars",
            "--fps",
            "30",
            "--log-level",
            "debug",
            "--param",
            "pattern_density=2",
            "--param",
            "bogus=1",
        ]);
        let mut config = EngineConfig::default();
        args.apply_to(&mut config);

        assert_eq!(config.default_effect, "spectrum-bars");
        assert_eq!(config.target_fps, 30.0);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.params.number(ParamKey::PatternDensity), Some(2.0));
    }
}
