//! Scan results and recorded scan runs

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one scan, threaded through the walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub folders: usize,
    pub files: usize,
    pub unchanged: usize,
    pub added: usize,
    pub changed: usize,
    pub missing: usize,
    /// Files or directories that could not be read
    pub errors: usize,
    pub ignored: usize,
}

impl ScanReport {
    /// True when the scan found nothing to record or flag
    #[cfg(test)]
    pub fn is_clean(&self) -> bool {
        self.added == 0 && self.changed == 0 && self.missing == 0
    }
}

/// A completed scan as stored in the `scan_runs` table
#[derive(Debug, Clone, Serialize)]
pub struct ScanRun {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub host: Option<String>,
    pub root: String,
    pub algorithm: String,
    pub report: ScanReport,
}

impl ScanRun {
    /// Create a run that started at `started_at` and finishes now
    pub fn finished(started_at: DateTime<Utc>, root: String, algorithm: String, report: ScanReport) -> Self {
        Self {
            id: 0, // Set by database
            started_at,
            finished_at: Utc::now(),
            host: sysinfo::System::host_name(),
            root,
            algorithm,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_report() {
        let mut report = ScanReport {
            folders: 3,
            files: 10,
            unchanged: 10,
            ..Default::default()
        };
        assert!(report.is_clean());
        report.missing = 1;
        assert!(!report.is_clean());
    }

    #[test]
    fn test_finished_run_orders_timestamps() {
        let started = Utc::now();
        let run = ScanRun::finished(started, "/data".into(), "sha256".into(), ScanReport::default());
        assert!(run.finished_at >= run.started_at);
        assert_eq!(run.id, 0);
    }
}
