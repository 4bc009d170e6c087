//! Events emitted while scanning a tree

use std::path::PathBuf;

/// Per-file outcomes and progress reported by the scanner as they happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A directory pass has started.
    DirectoryEntered { path: PathBuf, folders: usize, files: usize },

    /// A file was seen for the first time and recorded.
    Added { file_name: String, path: PathBuf },

    /// A tracked file's content no longer matches its stored checksum.
    Changed { file_name: String, path: PathBuf },

    /// A tracked file was neither seen during the walk nor found on disk.
    Missing { file_name: String, path: PathBuf },

    /// A file or directory could not be read and was skipped.
    Unreadable { path: PathBuf, reason: String },
}

impl ScanEvent {
    /// Status tag used in output and the audit log, if this is a per-file outcome
    pub fn status(&self) -> Option<&'static str> {
        match self {
            ScanEvent::DirectoryEntered { .. } => None,
            ScanEvent::Added { .. } => Some("Added"),
            ScanEvent::Changed { .. } => Some("Changed"),
            ScanEvent::Missing { .. } => Some("Missing"),
            ScanEvent::Unreadable { .. } => Some("Unreadable"),
        }
    }
}
