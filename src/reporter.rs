//! Full listing of one inventory

use crate::inventory::{inventory_path, FileRecord, Inventory, ScanRun};
use anyhow::Result;
use std::path::Path;

/// Every record of one inventory, ordered by file name
#[derive(Debug)]
pub struct Report {
    pub records: Vec<FileRecord>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Open a named inventory in `dir`; a missing or unreadable inventory is an error
pub fn open_inventory(dir: &Path, name: &str) -> Result<Inventory> {
    Ok(Inventory::open_existing(&inventory_path(dir, name))?)
}

/// Load all records of an inventory
pub fn build_report(inventory: &Inventory) -> Result<Report> {
    Ok(Report {
        records: inventory.records_by_name()?,
    })
}

/// Most recent scan run of an inventory
pub fn last_run(inventory: &Inventory) -> Result<Option<ScanRun>> {
    inventory.last_run()
}
