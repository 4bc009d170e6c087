use crate::inventory::{FileRecord, ScanReport, ScanRun};
use crate::scan_events::ScanEvent;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use colored::*;
use serde::Serialize;

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Quiet,   // Summary only
    Normal,  // File names
    Verbose, // Full paths
}

impl OutputMode {
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            OutputMode::Quiet
        } else if verbose > 0 {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        }
    }
}

pub const SEPARATOR_WIDTH: usize = 60;

pub fn separator() -> String {
    "-".repeat(SEPARATOR_WIDTH)
}

/// Unix seconds as local time, `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}

fn format_datetime<Tz: TimeZone>(time: &DateTime<Tz>) -> String {
    format_timestamp(time.timestamp())
}

/// Byte count, with a human-readable size once it reaches a KiB
pub fn format_size(size: i64) -> String {
    if size >= 1024 {
        format!("{} bytes ({})", size, bytesize::to_string(size as u64, true))
    } else {
        format!("{} bytes", size)
    }
}

/// Metadata block for one record, one field per line
pub fn format_record(record: &FileRecord) -> String {
    format!(
        "ID: {}\n\
         File Name: {}\n\
         Full Path: {}\n\
         Size: {}\n\
         Created: {}\n\
         Last Modified: {}\n\
         Owner: {}\n\
         Checksum: {}",
        record.id,
        record.file_name,
        record.full_path,
        format_size(record.size),
        format_timestamp(record.created),
        format_timestamp(record.last_modified),
        record.owner,
        record.checksum,
    )
}

/// Status line for a per-file scan outcome, e.g. `Added - a.txt`
///
/// Unreadable files are warnings and go to stderr instead; see
/// [`format_warning`].
pub fn format_status(event: &ScanEvent, mode: OutputMode) -> Option<String> {
    let (tag, file_name, path) = match event {
        ScanEvent::Added { file_name, path } => ("Added".green(), file_name, path),
        ScanEvent::Changed { file_name, path } => ("Changed".yellow(), file_name, path),
        ScanEvent::Missing { file_name, path } => ("Missing".red(), file_name, path),
        ScanEvent::DirectoryEntered { .. } | ScanEvent::Unreadable { .. } => return None,
    };

    match mode {
        OutputMode::Quiet => None,
        OutputMode::Normal => Some(format!("{} - {}", tag, file_name)),
        OutputMode::Verbose => Some(format!("{} - {}", tag, path.display())),
    }
}

/// Warning line for a skipped file
pub fn format_warning(event: &ScanEvent) -> Option<String> {
    match event {
        ScanEvent::Unreadable { path, reason } => Some(format!(
            "{} Error reading {}: {}",
            "Warning:".yellow(),
            path.display(),
            reason
        )),
        _ => None,
    }
}

/// End-of-scan summary
pub fn format_summary(report: &ScanReport) -> String {
    let mut lines = vec![
        String::new(),
        "--- Summary ---".bold().to_string(),
        format!("Folders processed: {}", report.folders),
        format!("Files processed: {}", report.files),
        format!("Files added: {}", report.added),
        format!("Files missing: {}", report.missing),
        format!("Files changed: {}", report.changed),
        format!("Files unchanged: {}", report.unchanged),
    ];
    if report.errors > 0 {
        lines.push(format!("Unreadable: {}", report.errors));
    }
    if report.ignored > 0 {
        lines.push(format!("Ignored: {}", report.ignored));
    }
    lines.join("\n")
}

/// Details of a recorded scan run
pub fn format_run(run: &ScanRun) -> String {
    format!(
        "Last Run: {}\n\
         Finished: {}\n\
         Host: {}\n\
         Root: {}\n\
         Algorithm: {}\n\
         Unchanged: {}\n\
         Changed: {}\n\
         New: {}\n\
         Missing: {}\n\
         Errors: {}\n\
         Ignored: {}",
        format_datetime(&run.started_at),
        format_datetime(&run.finished_at),
        run.host.as_deref().unwrap_or("unknown"),
        run.root,
        run.algorithm,
        run.report.unchanged,
        run.report.changed,
        run.report.added,
        run.report.missing,
        run.report.errors,
        run.report.ignored,
    )
}

/// Pretty-printed JSON
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| "Failed to serialize output")
}
