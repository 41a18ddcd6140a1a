//! SpectraSync - audio-reactive visuals synchronized with lyrics
//!
//! Offline driver: decodes a track, runs the frame loop against an in-memory
//! scene and reports beats, tempo and lyric changes as they happen.

#![warn(missing_docs)]

mod cli;
mod logging_setup;
mod wav;

use anyhow::{Context, Result};
use clap::Parser;
use spectrasync_core::{
    AudioFeed, Camera, ConfigError, EffectRegistry, EngineConfig, LyricsData, MemoryScene,
    PcmAudioFeed, Scene, VisualizerSession,
};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cli::Args;

/// Clock with no audio behind it, for running effects on silence
struct SilentClock {
    position: f64,
}

impl AudioFeed for SilentClock {
    fn is_ready(&self) -> bool {
        false
    }

    fn frequency_data(&mut self, _out: &mut [u8]) {}

    fn time_domain_data(&mut self, _out: &mut [u8]) {}

    fn current_time(&self) -> f64 {
        self.position
    }
}

/// What the frame loop plays
enum Playback {
    Track(PcmAudioFeed),
    Silence { clock: SilentClock, duration: f64 },
}

impl Playback {
    fn feed(&mut self) -> &mut dyn AudioFeed {
        match self {
            Playback::Track(feed) => feed,
            Playback::Silence { clock, .. } => clock,
        }
    }

    fn advance(&mut self, dt: f64) {
        match self {
            Playback::Track(feed) => feed.advance(dt),
            Playback::Silence { clock, duration } => {
                clock.position = (clock.position + dt).min(*duration);
            }
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            Playback::Track(feed) => feed.is_finished(),
            Playback::Silence { clock, duration } => clock.position >= *duration,
        }
    }
}

/// Totals printed when the run ends
#[derive(Debug, Default)]
struct RunStats {
    frames: u64,
    beats: u64,
    lyric_lines: u64,
    last_bpm: Option<f32>,
}

/// Configuration for this run
struct ResolvedConfig {
    config: EngineConfig,
    /// User config that existed but could not be used
    skipped: Option<(PathBuf, ConfigError)>,
}

/// Load `explicit` if given, else the user config at `user_path`.
///
/// A broken explicit file is fatal. A broken user config falls back to
/// defaults and is handed back so it can be reported once logging is up.
fn resolve_config(explicit: Option<&Path>, user_path: Option<PathBuf>) -> Result<ResolvedConfig> {
    if let Some(path) = explicit {
        let config = EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?;
        return Ok(ResolvedConfig {
            config,
            skipped: None,
        });
    }

    let Some(path) = user_path else {
        return Ok(ResolvedConfig {
            config: EngineConfig::default(),
            skipped: None,
        });
    };
    Ok(match EngineConfig::load_if_exists(&path) {
        Ok(config) => ResolvedConfig {
            config: config.unwrap_or_default(),
            skipped: None,
        },
        Err(e) => ResolvedConfig {
            config: EngineConfig::default(),
            skipped: Some((path, e)),
        },
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let ResolvedConfig {
        mut config,
        skipped,
    } = resolve_config(args.config.as_deref(), EngineConfig::config_path())?;
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    if let Some(path) = &args.write_config {
        if let Some((skipped_path, e)) = &skipped {
            eprintln!("Warning: Ignoring config at {:?}: {}", skipped_path, e);
        }
        config
            .save_to(path)
            .with_context(|| format!("Failed to write config: {:?}", path))?;
        println!("Configuration written to {:?}", path);
        return Ok(());
    }

    let registry = EffectRegistry::with_builtin();
    if args.list_effects {
        for id in registry.ids() {
            let name = registry.get(id).map(|e| e.name().to_string()).unwrap_or_default();
            println!("{:<16} {}", id, name);
        }
        return Ok(());
    }

    let _log_guard = logging_setup::init(&config.log)?;
    info!("SpectraSync starting");
    if let Some((path, e)) = &skipped {
        warn!("Ignoring config at {:?}, using defaults: {}", path, e);
        if !config.log.console_output {
            eprintln!("Warning: Ignoring config at {:?}: {}", path, e);
        }
    }

    let mut playback = match &args.audio {
        Some(path) => {
            let mut feed = wav::load(path)?.into_feed(config.bin_count, config.spectrum.clone())?;
            feed.play();
            Playback::Track(feed)
        }
        None => {
            warn!("No audio given, running {:.1}s of silence", args.duration);
            Playback::Silence {
                clock: SilentClock { position: 0.0 },
                duration: args.duration.max(0.0),
            }
        }
    };

    let mut session = VisualizerSession::from_config(&config, registry);
    if let Some(path) = &args.lyrics {
        let data = LyricsData::load_file(path)
            .with_context(|| format!("Failed to load lyrics: {:?}", path))?;
        session.load_lyrics(data);
    }
    let lyric_updates = session.subscribe_lyrics();

    let mut scene = MemoryScene::new();
    let mut camera = Camera::default();
    session
        .activate(&config.default_effect, &mut scene)
        .with_context(|| format!("Failed to activate effect '{}'", config.default_effect))?;
    info!(
        "Effect '{}' active with {} scene objects",
        config.default_effect,
        scene.len()
    );

    let dt = 1.0 / config.target_fps as f64;
    let frame_budget = Duration::from_secs_f64(dt);
    let report_every = config.target_fps.round().max(1.0) as u64;
    let mut stats = RunStats::default();
    let mut last_line = String::new();

    while !playback.is_finished() {
        let started = Instant::now();
        let frame = session.frame(playback.feed(), &mut scene, Some(&mut camera));
        stats.frames += 1;

        if frame.output.beat.is_beat {
            stats.beats += 1;
            debug!(
                "[{:>7.2}s] beat strength={:.2}",
                frame.playback_time, frame.output.beat.strength
            );
        }
        if frame.output.tempo_bpm.is_some() {
            stats.last_bpm = frame.output.tempo_bpm;
        }

        while let Some(state) = lyric_updates.try_recv() {
            if state.current_line != last_line {
                if !state.current_line.is_empty() {
                    stats.lyric_lines += 1;
                    info!("[{:>7.2}s] {}", frame.playback_time, state.current_line);
                }
                last_line = state.current_line;
            }
        }

        if frame.output.frame_index % report_every == 0 {
            info!(
                "[{:>7.2}s] energy={:.2} bpm={}",
                frame.playback_time,
                frame.output.features.band_energy.overall(),
                stats
                    .last_bpm
                    .map(|b| format!("{:.1}", b))
                    .unwrap_or_else(|| "-".to_string())
            );
        }

        playback.advance(dt);

        if args.realtime {
            if let Some(rest) = frame_budget.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
    }

    session.stop(&mut scene);
    info!("SpectraSync finished");

    println!("Frames:      {}", stats.frames);
    println!("Beats:       {}", stats.beats);
    match stats.last_bpm {
        Some(bpm) => println!("Tempo:       {:.1} BPM", bpm),
        None => println!("Tempo:       -"),
    }
    println!("Lyric lines: {}", stats.lyric_lines);

    Ok(())
}
