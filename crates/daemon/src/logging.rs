// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup.
//!
//! Human-readable output in debug mode, JSON lines otherwise.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {}: {source}", path.display())]
    Open { path: PathBuf, source: InitError },

    #[error("log subscriber already installed: {0}")]
    Init(#[from] TryInitError),
}

/// Filter directive: explicit level, else `debug` in debug mode, else `info`.
pub fn filter_directive(level: Option<&str>, debug: bool) -> &str {
    match level {
        Some(level) => level,
        None if debug => "debug",
        None => "info",
    }
}

fn filter(level: Option<&str>, debug: bool) -> EnvFilter {
    EnvFilter::try_new(filter_directive(level, debug)).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the background log writer.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = filter(config.log_level.as_deref(), config.debug);

    let (writer, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };
    let ansi = config.log_file.is_none();

    let layer = if config.debug {
        fmt::layer().with_writer(writer).with_ansi(ansi).with_filter(filter).boxed()
    } else {
        fmt::layer().json().with_current_span(true).with_writer(writer).with_filter(filter).boxed()
    };
    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(guard)
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|source| LoggingError::Open { path: path.to_path_buf(), source })
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
