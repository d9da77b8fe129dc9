//! Logging setup: stderr plus an optional daily rolling file under `log.dir`.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogConfig;

const LOG_PREFIX: &str = "bot";
const LOG_SUFFIX: &str = "log";

/// Keeps the background log writer alive. Dropping it flushes the file.
pub struct Telemetry {
    _file_guard: Option<WorkerGuard>,
}

/// `bot.YYYY-MM-DD.log` in `dir`, rolled at midnight, newest `keep_days` kept.
fn file_appender(dir: &Path, keep_days: u32) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix(LOG_SUFFIX)
        .max_log_files(usize::try_from(keep_days.max(1)).unwrap_or(usize::MAX))
        .build(dir)
        .with_context(|| format!("opening log file in {}", dir.display()))
}

/// Filter directive: `RUST_LOG` wins, then the CLI flag, then config.
fn filter_for(config: &LogConfig, cli_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = cli_level.unwrap_or(&config.level).to_ascii_lowercase();
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Install the global subscriber. Call once, before any work starts, and hold
/// the returned value until exit.
pub fn init(config: &LogConfig, cli_level: Option<&str>) -> anyhow::Result<Telemetry> {
    let (file_layer, file_guard) = if config.dir.is_empty() {
        (None, None)
    } else {
        let appender = file_appender(Path::new(&config.dir), config.keep_days)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer);
        (Some(layer), Some(guard))
    };
    let text_layer = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr));
    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter_for(config, cli_level))
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .context("installing log subscriber")?;

    Ok(Telemetry {
        _file_guard: file_guard,
    })
}
