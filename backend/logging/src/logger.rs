//! Structured Logger
//!
//! Wraps `tracing` with env-based level control, a console layer (plain or
//! JSON) and an optional NDJSON rolling file.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Options for [`init_logger`].
#[derive(Debug, Clone, Copy)]
pub struct LoggerOptions<'a> {
    /// Fallback filter when `RUST_LOG` is unset (e.g. "info", "pantry=debug").
    pub level: &'a str,
    /// Emit console output as JSON lines instead of human-readable text.
    pub json: bool,
    /// Directory for daily-rotated `pantry.log.YYYY-MM-DD` files.
    pub log_dir: Option<&'a Path>,
    /// Write console output to stderr, keeping stdout for command results.
    pub stderr: bool,
}

impl Default for LoggerOptions<'_> {
    fn default() -> Self {
        Self {
            level: "info",
            json: false,
            log_dir: None,
            stderr: false,
        }
    }
}

/// Initialize the global subscriber. Calling it twice is a no-op.
pub fn init_logger(options: LoggerOptions<'_>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.level));

    let console_writer = || {
        if options.stderr {
            BoxMakeWriter::new(std::io::stderr)
        } else {
            BoxMakeWriter::new(std::io::stdout)
        }
    };

    let json_console = options.json.then(|| {
        fmt::layer()
            .json()
            .with_writer(console_writer())
            .with_ansi(false)
    });

    let plain_console = (!options.json).then(|| {
        fmt::layer()
            .with_writer(console_writer())
            .with_target(false)
            .with_ansi(true)
    });

    let file_layer = options.log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "pantry.log");
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(plain_console)
        .with(file_layer)
        .try_init();
}
