//! Logging utilities for the fanout service.
//!
//! Every crate logs through `tracing`; this module installs the subscriber
//! once at startup. Output goes to stdout and, if configured, to a log file
//! written by a non-blocking appender.

use fanout_config::LoggingConfig;
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber at INFO.
///
/// # Examples
///
/// ```
/// use fanout_common::logging;
///
/// logging::init();
/// logging::init_with_level(tracing::Level::DEBUG);
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// `RUST_LOG` is honoured in addition to the given level. Calling this more
/// than once is harmless; only the first call installs a subscriber.
pub fn init_with_level(level: Level) {
    let result = tracing_subscriber::registry()
        .with(stdout_layer())
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize logging from the `logging` config section.
///
/// Returns the guard of the file appender when a log file is configured; it
/// must be held for as long as the process logs, dropping it flushes the file.
/// A log file that cannot be created falls back to stdout only.
pub fn init_from_config(config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = Level::from_str(&config.level).unwrap_or_else(|_| {
        eprintln!("Unknown log level '{}', using info", config.level);
        Level::INFO
    });

    let Some(file) = config.file.as_deref() else {
        init_with_level(level);
        return None;
    };

    let path = Path::new(file);
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned();

    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
    {
        Ok(appender) => appender,
        Err(err) => {
            init_with_level(level);
            warn!("Cannot open log file {}, logging to stdout only: {}", file, err);
            return None;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let result = tracing_subscriber::registry()
        .with(stdout_layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {} (file: {})", level, file);
    }
    Some(guard)
}

fn stdout_layer<S>() -> fmt::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
}

fn build_filter(level: Level) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match format!("fanout={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Log an error with context at the ERROR level.
pub fn log_error<E: std::fmt::Display>(error: E, context: &str) {
    error!("{}: {}", context, error);
}

/// Log a result, with different messages for success and error cases.
///
/// Returns the original result so it can be used in a chain.
pub fn log_result<T, E: std::fmt::Display>(
    result: Result<T, E>,
    success_message: &str,
    error_context: &str,
) -> Result<T, E> {
    match &result {
        Ok(_) => info!("{}", success_message),
        Err(e) => warn!("{}: {}", error_context, e),
    }
    result
}
