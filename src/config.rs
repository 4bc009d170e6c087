//! User configuration
//!
//! Read from `config.toml` in the platform config directory (or the file
//! named by `FILETRACK_CONFIG`). Every field is optional; environment
//! variables override the file for the two storage directories.

use crate::checksum::HashAlgorithm;
use crate::ignore::{read_ignore_file, IgnoreSet};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "FILETRACK_CONFIG";
pub const DB_DIR_ENV: &str = "FILETRACK_DB_DIR";
pub const LOG_DIR_ENV: &str = "FILETRACK_LOG_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `*.db` inventories [default: ~/db/FileTracker]
    pub inventory_dir: Option<PathBuf>,
    /// Directory for scan audit logs [default: ~/logs/FileTracker]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub algorithm: HashAlgorithm,
    /// File and directory name patterns to skip
    pub ignore: Vec<String>,
    /// Extra names to skip, one per line [default: ~/.rsync-ignore]
    pub ignore_file: Option<PathBuf>,
    /// Write a per-run audit log
    pub write_log: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            ignore: vec![".DS_Store".to_string()],
            ignore_file: home_dir().map(|h| h.join(".rsync-ignore")),
            write_log: true,
        }
    }
}

impl Config {
    /// Load from the default location; a missing file means defaults
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit file; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Where inventories live
    pub fn inventory_dir(&self) -> Result<PathBuf> {
        resolve_dir(DB_DIR_ENV, self.paths.inventory_dir.as_deref(), &["db", "FileTracker"])
    }

    /// Where scan audit logs go
    pub fn log_dir(&self) -> Result<PathBuf> {
        resolve_dir(LOG_DIR_ENV, self.paths.log_dir.as_deref(), &["logs", "FileTracker"])
    }

    /// Configured patterns plus the names listed in the ignore file
    pub fn ignore_set(&self) -> Result<IgnoreSet> {
        let mut patterns = self.scan.ignore.clone();
        if let Some(ref file) = self.scan.ignore_file {
            patterns.extend(read_ignore_file(file)?);
        }
        IgnoreSet::new(&patterns)
    }
}

/// Path of the config file, if one can be determined
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    directories::ProjectDirs::from("", "", "filetrack")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

fn resolve_dir(env_var: &str, configured: Option<&Path>, under_home: &[&str]) -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(env_var) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = configured {
        return Ok(dir.to_path_buf());
    }

    let mut dir = home_dir().context("Could not determine home directory")?;
    for part in under_home {
        dir.push(part);
    }
    Ok(dir)
}
