//! Tracing subscriber setup
//!
//! Stdout always; optionally a non-blocking file appender next to it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;

pub fn parse_rotation(value: &str) -> Result<Rotation> {
    match value.trim().to_lowercase().as_str() {
        "never" => Ok(Rotation::NEVER),
        "minutely" => Ok(Rotation::MINUTELY),
        "hourly" => Ok(Rotation::HOURLY),
        "daily" => Ok(Rotation::DAILY),
        other => bail!("logging.rotation {:?} is not one of never, minutely, hourly, daily", other),
    }
}

/// Non-blocking writer for `dir/file_name`. Buffered lines are flushed when
/// the guard is dropped.
pub fn file_writer(dir: &Path, file_name: &str, rotation: Rotation) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file_name)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))?;

    Ok(tracing_appender::non_blocking(appender))
}

fn stdout_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = fmt::layer().with_target(true).with_line_number(true);
    if json {
        base.json().with_current_span(true).boxed()
    } else {
        base.boxed()
    }
}

fn file_layer<S>(writer: NonBlocking, json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);
    if json {
        base.json().with_current_span(true).boxed()
    } else {
        base.boxed()
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `config.level`.
///
/// The returned guard must be held for the life of the process when file
/// logging is enabled, or buffered lines are lost.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file, guard) = match config.log_dir() {
        Some(dir) => {
            let rotation = parse_rotation(&config.rotation)?;
            let (writer, guard) = file_writer(&dir, &config.file_name, rotation)?;
            (Some(file_layer(writer, config.json)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer(config.json))
        .with(file)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("basement-keeper-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_parse_rotation() {
        assert_eq!(parse_rotation("never").unwrap(), Rotation::NEVER);
        assert_eq!(parse_rotation(" Daily ").unwrap(), Rotation::DAILY);
        assert!(parse_rotation("weekly").is_err());
    }

    #[test]
    fn test_file_layer_writes_keeper_log() {
        let dir = scratch_dir();
        let (writer, guard) = file_writer(&dir, "keeper.log", Rotation::NEVER).unwrap();

        let subscriber = tracing_subscriber::registry().with(file_layer(writer, false));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(price = 142.37, "Reference price resolved");
        });
        drop(guard);

        let contents = std::fs::read_to_string(dir.join("keeper.log")).unwrap();
        assert!(contents.contains("Reference price resolved"));
        assert!(contents.contains("142.37"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_json_file_lines() {
        let dir = scratch_dir();
        let (writer, guard) = file_writer(&dir, "keeper.log", Rotation::NEVER).unwrap();

        let subscriber = tracing_subscriber::registry().with(file_layer(writer, true));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(venue = "orca", "Venue omitted");
        });
        drop(guard);

        let contents = std::fs::read_to_string(dir.join("keeper.log")).unwrap();
        let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(line["fields"]["venue"], "orca");
        assert_eq!(line["level"], "WARN");
        std::fs::remove_dir_all(&dir).ok();
    }
}
