//! Tracing setup for the command-line tools
//!
//! Diagnostics go to stderr, filtered by `RUST_LOG` or the `-v` count. The
//! scanner can additionally write every per-file status line to an audit log
//! file without colours.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Target of the per-file status events
pub const AUDIT_TARGET: &str = "filetrack::audit";

/// Stderr level for a `-v` count
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Audit log file for one scan: `<inventory>-<YYYY-MM-DD-HH-MM-SS>.log`
pub fn audit_log_path(log_dir: &Path, inventory_file: &str, at: DateTime<Local>) -> PathBuf {
    let stem = Path::new(inventory_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| inventory_file.to_string());
    log_dir.join(format!("{}-{}.log", stem, at.format("%Y-%m-%d-%H-%M-%S")))
}

/// Install the global subscriber
///
/// Audit lines never reach stderr; they only go to `audit_log` when given.
/// Calling this twice in one process is an error.
pub fn init(verbosity: u8, audit_log: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)))
        .add_directive(
            format!("{}=off", AUDIT_TARGET)
                .parse()
                .with_context(|| "Invalid audit filter directive")?,
        );

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let file_layer = match audit_log {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(Targets::new().with_target("filetrack", Level::INFO)),
            )
        }
        None => None,
    };

    Registry::default()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .with_context(|| "Failed to install tracing subscriber")?;

    Ok(())
}
