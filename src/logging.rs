// src/logging.rs

//! Logging setup for `cmdrelay` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. the level passed by the embedding application (usually `[logging].level`)
//! 2. `CMDRELAY_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that the host application's stdout stays free.

use tracing_subscriber::fmt;

use crate::types::LogLevel;

/// Initialise the global logging subscriber.
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init_logging(level: Option<LogLevel>) {
    let level = match level {
        Some(lvl) => lvl,
        None => std::env::var("CMDRELAY_LOG")
            .ok()
            .and_then(|s| s.parse::<LogLevel>().ok())
            .unwrap_or_default(),
    };

    let _ = fmt()
        .with_max_level(tracing_level(level))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn tracing_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}
