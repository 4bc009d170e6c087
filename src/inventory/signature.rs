//! File metadata captured at scan time

use anyhow::{Context, Result};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata snapshot of a regular file
///
/// Everything a record needs except the checksum, which is computed
/// separately so quick scans can skip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSignature {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    /// Unix seconds
    pub created: i64,
    /// Unix seconds
    pub modified: i64,
    pub owner: String,
}

impl FileSignature {
    /// Build a signature from already fetched metadata
    pub fn from_metadata(path: &Path, metadata: &Metadata, owners: &OwnerLookup) -> Result<Self> {
        let modified = metadata
            .modified()
            .with_context(|| format!("Failed to get mtime: {}", path.display()))?;
        // Not every filesystem records birth time
        let created = metadata.created().unwrap_or(modified);

        Ok(Self {
            path: path.to_path_buf(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: metadata.len(),
            created: system_time_to_secs(created),
            modified: system_time_to_secs(modified),
            owner: owners.owner_of(metadata),
        })
    }

    /// Read metadata for `path` and build a signature
    pub fn from_path(path: &Path, owners: &OwnerLookup) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
        Self::from_metadata(path, &metadata, owners)
    }

    /// Stored form of the path
    pub fn path_key(&self) -> String {
        path_key(&self.path)
    }

    /// Size as stored in SQLite, capped at i64::MAX
    pub fn size_i64(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }
}

/// Resolves file owners to user names
///
/// The user list is loaded once and reused for every file of a scan.
pub struct OwnerLookup {
    #[cfg(unix)]
    users: sysinfo::Users,
}

impl OwnerLookup {
    pub fn new() -> Self {
        Self {
            #[cfg(unix)]
            users: sysinfo::Users::new_with_refreshed_list(),
        }
    }

    #[cfg(unix)]
    pub fn owner_of(&self, metadata: &Metadata) -> String {
        use std::os::unix::fs::MetadataExt;

        let uid = metadata.uid();
        self.users
            .list()
            .iter()
            .find(|user| **user.id() == uid)
            .map(|user| user.name().to_string())
            .unwrap_or_else(|| uid.to_string())
    }

    #[cfg(not(unix))]
    pub fn owner_of(&self, _metadata: &Metadata) -> String {
        "unknown".to_string()
    }
}

impl Default for OwnerLookup {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a path into the string used as the record key
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Convert SystemTime to unix seconds; times before the epoch go negative
pub fn system_time_to_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => i64::try_from(duration.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    }
}
