//! Global tracing subscriber for the command-line driver.

use anyhow::{Context, Result};
use spectrasync_core::LogConfig;
use std::fs::File;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Flushes the log file when dropped; hold it until `main` returns
pub struct LogGuard {
    _file_writer: WorkerGuard,
}

/// Install stderr and file logging as described by `config`.
///
/// `RUST_LOG`, when set, replaces the configured level.
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    config
        .ensure_log_directory()
        .with_context(|| format!("Failed to create log directory {:?}", config.log_dir))?;

    let pruned = config.cleanup_old_logs().unwrap_or_else(|e| {
        eprintln!("Warning: Could not prune old logs in {:?}: {}", config.log_dir, e);
        0
    });

    let filter = EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy();

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.console_output {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter.clone())
                .boxed(),
        );
    }

    let guard = if config.file_output {
        let (layer, guard) = file_layer(config, filter)?;
        layers.push(layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("A global logger is already installed")?;

    tracing::debug!(
        "Logging at '{}' (console={}, file={}, pruned {} old logs)",
        config.level,
        config.console_output,
        config.file_output,
        pruned
    );
    Ok(guard)
}

/// Plain-text layer writing to a new timestamped file from a background thread
fn file_layer(config: &LogConfig, filter: EnvFilter) -> Result<(BoxedLayer, LogGuard)> {
    let path = config.current_log_path();
    let file =
        File::create(&path).with_context(|| format!("Failed to create log file {:?}", path))?;
    let (writer, worker) = tracing_appender::non_blocking(file);
    eprintln!("Writing logs to {:?}", path);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(filter)
        .boxed();
    Ok((
        layer,
        LogGuard {
            _file_writer: worker,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_layer_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            file_output: true,
            log_dir: dir.path().to_path_buf(),
            ..LogConfig::default()
        };

        let (_layer, _guard) = file_layer(&config, EnvFilter::new("info")).unwrap();
        let logs: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".log"))
            .collect();
        assert_eq!(logs.len(), 1);
    }
}
