//! Names skipped during a scan

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

/// Compiled ignore patterns, matched against a single file or directory name
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    set: GlobSet,
    patterns: Vec<String>,
}

impl IgnoreSet {
    /// Compile name patterns; a pattern that is not a valid glob matches literally
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            let glob = match Glob::new(pattern) {
                Ok(glob) => glob,
                Err(e) => {
                    tracing::debug!("Ignore pattern {:?} is not a glob ({}), matching literally", pattern, e);
                    Glob::new(&globset::escape(pattern))
                        .with_context(|| format!("Invalid ignore pattern: {}", pattern))?
                }
            };
            builder.add(glob);
            kept.push(pattern.to_string());
        }

        let set = builder.build().with_context(|| "Failed to compile ignore patterns")?;
        Ok(Self { set, patterns: kept })
    }

    /// An ignore set that matches nothing
    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    pub fn is_ignored(&self, name: &OsStr) -> bool {
        self.set.is_match(Path::new(name))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Read an ignore file: one name per line, blank lines and `#` comments skipped
///
/// A missing file yields no patterns.
pub fn read_ignore_file(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ignore file: {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exact_and_glob_patterns() {
        let set = IgnoreSet::new(&[".DS_Store", "*.tmp", "node_modules"]).unwrap();
        assert!(set.is_ignored(OsStr::new(".DS_Store")));
        assert!(set.is_ignored(OsStr::new("scratch.tmp")));
        assert!(set.is_ignored(OsStr::new("node_modules")));
        assert!(!set.is_ignored(OsStr::new("notes.txt")));
        assert!(!set.is_ignored(OsStr::new("DS_Store")));
    }

    #[test]
    fn test_invalid_glob_matches_literally() {
        let set = IgnoreSet::new(&["weird[name"]).unwrap();
        assert!(set.is_ignored(OsStr::new("weird[name")));
        assert_eq!(set.patterns(), &["weird[name".to_string()]);
    }

    #[test]
    fn test_empty_set() {
        let set = IgnoreSet::empty();
        assert!(!set.is_ignored(OsStr::new(".DS_Store")));
    }

    #[test]
    fn test_read_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".rsync-ignore");
        fs::write(&path, "# comment\n.cache\n\n  Thumbs.db  \r\n").unwrap();

        let patterns = read_ignore_file(&path).unwrap();
        assert_eq!(patterns, vec![".cache", "Thumbs.db"]);
    }

    #[test]
    fn test_read_missing_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_ignore_file(&temp_dir.path().join("none")).unwrap().is_empty());
    }
}
