//! Stored file records

use rusqlite::Row;
use serde::Serialize;

/// Columns selected for a full record, in `FileRecord::from_row` order
pub const RECORD_COLUMNS: &str =
    "id, file_name, full_path, size, created, last_modified, owner, checksum";

/// One row of the `files` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub file_name: String,
    pub full_path: String,
    pub size: i64,
    /// Unix seconds
    pub created: i64,
    /// Unix seconds
    pub last_modified: i64,
    pub owner: String,
    pub checksum: String,
}

impl FileRecord {
    /// Map a row selected with [`RECORD_COLUMNS`]
    ///
    /// Inventories written by other tools may leave columns NULL; those read
    /// back as zero or empty.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            file_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            full_path: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            size: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
            created: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            last_modified: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
            owner: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            checksum: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        })
    }
}

/// The fields reconciliation compares against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredState {
    pub checksum: Option<String>,
    pub size: Option<i64>,
    pub last_modified: Option<i64>,
}

impl StoredState {
    /// True when size and mtime both equal the stored values
    pub fn metadata_matches(&self, size: i64, last_modified: i64) -> bool {
        self.size == Some(size) && self.last_modified == Some(last_modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_matches() {
        let state = StoredState {
            checksum: Some("abc".to_string()),
            size: Some(5),
            last_modified: Some(100),
        };
        assert!(state.metadata_matches(5, 100));
        assert!(!state.metadata_matches(6, 100));
        assert!(!state.metadata_matches(5, 101));
    }

    #[test]
    fn test_metadata_never_matches_null_columns() {
        let state = StoredState {
            checksum: None,
            size: None,
            last_modified: None,
        };
        assert!(!state.metadata_matches(0, 0));
    }
}
