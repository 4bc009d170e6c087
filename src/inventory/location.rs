//! Where inventory files live and how they are named

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const INVENTORY_EXTENSION: &str = "db";

/// File name for an inventory, adding `.db` when the name has no such suffix
pub fn inventory_file_name(name: &str) -> String {
    let name = name.trim();
    if Path::new(name)
        .extension()
        .map(|ext| ext == INVENTORY_EXTENSION)
        .unwrap_or(false)
    {
        name.to_string()
    } else {
        format!("{}.{}", name, INVENTORY_EXTENSION)
    }
}

/// Full path of a named inventory inside `dir`
pub fn inventory_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(inventory_file_name(name))
}

/// Label shown for an inventory: its file name
pub fn inventory_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// List all inventory files in `dir`, sorted by file name
///
/// A directory that does not exist holds no inventories.
pub fn list_inventories(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut inventories: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read inventory directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext == INVENTORY_EXTENSION)
                .unwrap_or(false)
        })
        .collect();

    inventories.sort();
    Ok(inventories)
}
