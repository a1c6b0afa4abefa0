//! Structured Logger
//!
//! Console output plus a daily rolling NDJSON file, level from `RUST_LOG` or
//! the configured default.

use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the file writer flushing. Drop it only at shutdown.
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Initialize the global logger.
///
/// Files land in `log_dir` as `flexscan.log.YYYY-MM-DD`. With `json_console`
/// the console layer also writes JSON lines.
pub fn init_logger<P: AsRef<Path>>(log_dir: P, level: &str, json_console: bool) -> Result<LogGuard> {
    std::fs::create_dir_all(log_dir.as_ref())?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "flexscan.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(file_writer).with_ansi(false);

    let console_layer = if json_console {
        fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    };

    // A second init in the same process (tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(LogGuard { _file: guard })
}
