//! SQLite operations for inventory files

use crate::inventory::location::inventory_label;
use crate::inventory::record::{FileRecord, StoredState, RECORD_COLUMNS};
use crate::inventory::session::{ScanReport, ScanRun};
use crate::inventory::signature::FileSignature;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY,
        file_name TEXT,
        full_path TEXT UNIQUE,
        size INTEGER,
        created INTEGER,
        last_modified INTEGER,
        owner TEXT,
        checksum TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_files_file_name ON files(file_name);
    CREATE TABLE IF NOT EXISTS scan_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        started_at INTEGER NOT NULL,
        finished_at INTEGER NOT NULL,
        host TEXT,
        root TEXT NOT NULL,
        algorithm TEXT NOT NULL,
        folders INTEGER NOT NULL,
        files INTEGER NOT NULL,
        unchanged INTEGER NOT NULL,
        added INTEGER NOT NULL,
        changed INTEGER NOT NULL,
        missing INTEGER NOT NULL,
        errors INTEGER NOT NULL,
        ignored INTEGER NOT NULL
    );
";

/// Failures opening an inventory for reading
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// No inventory file with that name exists
    #[error("Database {name} not found in {}", dir.display())]
    NotFound { name: String, dir: PathBuf },
    /// The file exists but SQLite cannot use it (corrupt, locked, not a database)
    #[error("Cannot open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
}

/// How a file name is matched during lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact,
    /// Substring match
    Partial,
}

/// One inventory file
#[derive(Debug)]
pub struct Inventory {
    db: Connection,
    path: PathBuf,
}

impl Inventory {
    /// Open an inventory for scanning, creating the file and schema if needed
    pub fn open_or_create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create inventory directory: {}", parent.display())
            })?;
        }

        let db = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        db.busy_timeout(BUSY_TIMEOUT)
            .with_context(|| "Failed to set busy timeout")?;
        db.execute_batch(SCHEMA)
            .with_context(|| format!("Failed to initialize schema in {}", path.display()))?;

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Throwaway inventory that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().with_context(|| "Failed to open in-memory database")?;
        db.execute_batch(SCHEMA)
            .with_context(|| "Failed to initialize in-memory schema")?;

        Ok(Self {
            db,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Open an existing inventory read-only
    ///
    /// Never creates a file. The database header is probed so corrupt files
    /// fail here rather than at the first query.
    pub fn open_existing(path: &Path) -> Result<Self, InventoryError> {
        if !path.is_file() {
            return Err(InventoryError::NotFound {
                name: inventory_label(path),
                dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            });
        }

        let open_err = |source| InventoryError::Open {
            path: path.to_path_buf(),
            source,
        };
        let db = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_err)?;
        db.busy_timeout(BUSY_TIMEOUT).map_err(open_err)?;
        db.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(open_err)?;

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inventory file name, used to label output
    pub fn label(&self) -> String {
        inventory_label(&self.path)
    }

    /// Stored state for a path, if it is tracked
    #[cfg(test)]
    pub fn lookup(&self, full_path: &str) -> Result<Option<StoredState>> {
        lookup_state(&self.db, full_path)
    }

    /// Run `f` inside one transaction, committing only if it succeeds
    pub fn batch<T>(&mut self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let tx = self
            .db
            .transaction()
            .with_context(|| "Failed to start transaction")?;
        let out = f(&tx)?;
        tx.commit().with_context(|| "Failed to commit transaction")?;
        Ok(out)
    }

    /// Every tracked (full_path, file_name) in storage order
    pub fn tracked_paths(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .db
            .prepare("SELECT full_path, file_name FROM files ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            ))
        })?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }
        Ok(paths)
    }

    /// Records whose file name matches `name`
    pub fn find_by_name(&self, name: &str, mode: NameMatch) -> Result<Vec<FileRecord>> {
        let (sql, pattern) = match mode {
            NameMatch::Exact => (
                format!(
                    "SELECT {} FROM files WHERE file_name = ?1 ORDER BY rowid",
                    RECORD_COLUMNS
                ),
                name.to_string(),
            ),
            NameMatch::Partial => (
                format!(
                    "SELECT {} FROM files WHERE file_name LIKE ?1 ESCAPE '\\' ORDER BY rowid",
                    RECORD_COLUMNS
                ),
                format!("%{}%", escape_like(name)),
            ),
        };

        let mut stmt = self
            .db
            .prepare(&sql)
            .with_context(|| format!("Failed to query {}", self.path.display()))?;
        let rows = stmt.query_map([pattern], FileRecord::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// All records ordered by file name, ties in storage order
    pub fn records_by_name(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self
            .db
            .prepare(&format!(
                "SELECT {} FROM files ORDER BY file_name, rowid",
                RECORD_COLUMNS
            ))
            .with_context(|| format!("Failed to query {}", self.path.display()))?;
        let rows = stmt.query_map([], FileRecord::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Full record for one path
    pub fn record(&self, full_path: &str) -> Result<Option<FileRecord>> {
        let record = self
            .db
            .query_row(
                &format!("SELECT {} FROM files WHERE full_path = ?1", RECORD_COLUMNS),
                [full_path],
                FileRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Number of tracked files
    #[cfg(test)]
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Append a finished scan run, returning its id
    pub fn record_run(&mut self, run: &ScanRun) -> Result<i64> {
        let report = &run.report;
        self.db
            .execute(
                "INSERT INTO scan_runs (started_at, finished_at, host, root, algorithm,
                    folders, files, unchanged, added, changed, missing, errors, ignored)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    run.started_at.timestamp(),
                    run.finished_at.timestamp(),
                    run.host,
                    run.root,
                    run.algorithm,
                    report.folders as i64,
                    report.files as i64,
                    report.unchanged as i64,
                    report.added as i64,
                    report.changed as i64,
                    report.missing as i64,
                    report.errors as i64,
                    report.ignored as i64,
                ],
            )
            .with_context(|| "Failed to record scan run")?;

        Ok(self.db.last_insert_rowid())
    }

    /// Most recent scan run, if any was recorded
    ///
    /// Inventories from other producers have no `scan_runs` table; that reads
    /// as no run.
    pub fn last_run(&self) -> Result<Option<ScanRun>> {
        if !self.has_table("scan_runs")? {
            return Ok(None);
        }

        let run = self
            .db
            .query_row(
                "SELECT id, started_at, finished_at, host, root, algorithm,
                    folders, files, unchanged, added, changed, missing, errors, ignored
                 FROM scan_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    let started_at: i64 = row.get(1)?;
                    let finished_at: i64 = row.get(2)?;
                    let count = |idx: usize| -> rusqlite::Result<usize> {
                        Ok(row.get::<_, i64>(idx)? as usize)
                    };

                    Ok(ScanRun {
                        id: row.get(0)?,
                        started_at: DateTime::from_timestamp(started_at, 0)
                            .unwrap_or_else(Utc::now),
                        finished_at: DateTime::from_timestamp(finished_at, 0)
                            .unwrap_or_else(Utc::now),
                        host: row.get(3)?,
                        root: row.get(4)?,
                        algorithm: row.get(5)?,
                        report: ScanReport {
                            folders: count(6)?,
                            files: count(7)?,
                            unchanged: count(8)?,
                            added: count(9)?,
                            changed: count(10)?,
                            missing: count(11)?,
                            errors: count(12)?,
                            ignored: count(13)?,
                        },
                    })
                },
            )
            .optional()?;

        Ok(run)
    }

    fn has_table(&self, table: &str) -> Result<bool> {
        let found: Option<i64> = self
            .db
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Stored state for a path, usable inside a transaction
pub fn lookup_state(conn: &Connection, full_path: &str) -> Result<Option<StoredState>> {
    let state = conn
        .query_row(
            "SELECT checksum, size, last_modified FROM files WHERE full_path = ?1 LIMIT 1",
            [full_path],
            |row| {
                Ok(StoredState {
                    checksum: row.get(0)?,
                    size: row.get(1)?,
                    last_modified: row.get(2)?,
                })
            },
        )
        .optional()
        .with_context(|| format!("Failed to look up {}", full_path))?;
    Ok(state)
}

/// Insert a newly observed file
pub fn insert_record(conn: &Connection, sig: &FileSignature, checksum: &str) -> Result<()> {
    let full_path = sig.path_key();
    conn.execute(
        "INSERT INTO files (file_name, full_path, size, created, last_modified, owner, checksum)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            sig.file_name,
            full_path,
            sig.size_i64(),
            sig.created,
            sig.modified,
            sig.owner,
            checksum
        ],
    )
    .with_context(|| format!("Failed to insert record for {}", full_path))?;
    Ok(())
}

/// Update content fields of a tracked file in place
pub fn update_content(conn: &Connection, sig: &FileSignature, checksum: &str) -> Result<()> {
    let full_path = sig.path_key();
    conn.execute(
        "UPDATE files SET checksum = ?1, size = ?2, last_modified = ?3 WHERE full_path = ?4",
        params![checksum, sig.size_i64(), sig.modified, full_path],
    )
    .with_context(|| format!("Failed to update record for {}", full_path))?;
    Ok(())
}

/// Escape LIKE wildcards so the query text matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
