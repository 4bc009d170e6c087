//! Look up files by name across inventories

use crate::inventory::{
    inventory_label, inventory_path, list_inventories, FileRecord, Inventory, NameMatch,
};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A record found in one inventory
#[derive(Debug, Clone, Serialize)]
pub struct FindMatch {
    pub inventory: String,
    #[serde(flatten)]
    pub record: FileRecord,
}

/// An inventory left out of a multi-inventory search
#[derive(Debug, Clone)]
pub struct SkippedInventory {
    pub inventory: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct FindOutcome {
    /// Inventories that were considered
    pub searched: usize,
    pub matches: Vec<FindMatch>,
    pub skipped: Vec<SkippedInventory>,
}

impl FindOutcome {
    pub fn found(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Search one named inventory in `dir`
///
/// The inventory must exist and be readable; any failure is returned.
pub fn find_in_named(dir: &Path, inventory: &str, name: &str, mode: NameMatch) -> Result<FindOutcome> {
    let path = inventory_path(dir, inventory);
    let matches = search_inventory(&path, name, mode)?;
    Ok(FindOutcome {
        searched: 1,
        matches,
        skipped: Vec::new(),
    })
}

/// Search every inventory in `dir`
pub fn find_in_all(dir: &Path, name: &str, mode: NameMatch) -> Result<FindOutcome> {
    let inventories = list_inventories(dir)?;
    Ok(find_in_inventories(&inventories, name, mode))
}

/// Search the given inventory files in order
///
/// An inventory that cannot be opened or queried is recorded in
/// `skipped` and the search moves on.
pub fn find_in_inventories(inventories: &[PathBuf], name: &str, mode: NameMatch) -> FindOutcome {
    let mut outcome = FindOutcome {
        searched: inventories.len(),
        ..Default::default()
    };

    for path in inventories {
        match search_inventory(path, name, mode) {
            Ok(matches) => outcome.matches.extend(matches),
            Err(e) => {
                tracing::debug!("Skipping {}: {:#}", path.display(), e);
                outcome.skipped.push(SkippedInventory {
                    inventory: path.clone(),
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    outcome
}

fn search_inventory(path: &Path, name: &str, mode: NameMatch) -> Result<Vec<FindMatch>> {
    let inventory = Inventory::open_existing(path)?;
    let label = inventory_label(path);

    Ok(inventory
        .find_by_name(name, mode)?
        .into_iter()
        .map(|record| FindMatch {
            inventory: label.clone(),
            record,
        })
        .collect())
}
