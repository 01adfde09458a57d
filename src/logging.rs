//! Logging setup for the `openclean` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the application. [`init`] installs a console layer and, optionally, a
//! daily rolling log file in the platform data directory.
//!
//! ```no_run
//! use openclean::logging;
//!
//! logging::init("info", false)?;
//! tracing::info!("Started");
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/openclean/logs`
/// - macOS: `~/Library/Application Support/openclean/logs`
/// - Linux: `~/.local/share/openclean/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join("openclean").join("logs"))
}

/// Build the filter: `RUST_LOG` wins over `default_level`.
pub fn env_filter(default_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("Invalid log filter '{default_level}'"))
}

/// Initializes console logging, plus a rolling file when `to_file` is set.
///
/// Console output goes to stderr so that command output on stdout stays
/// clean. The file keeps 7 days of logs.
///
/// # Errors
///
/// Returns error if the filter is invalid, the log directory cannot be
/// created, or a subscriber is already installed.
pub fn init(default_level: &str, to_file: bool) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter(default_level)?);

    let file_layer = if to_file {
        let log_dir = get_log_dir()?;
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .max_log_files(7)
            .filename_prefix("openclean")
            .filename_suffix("log")
            .build(&log_dir)
            .context("Failed to create log file appender")?;
        Some(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .with_ansi(false)
                .with_writer(appender)
                .with_filter(env_filter(default_level)?),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::debug!(to_file, "Logging initialized");
    Ok(())
}
