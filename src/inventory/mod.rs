//! Persistent file inventories
//!
//! Each named inventory is one SQLite file holding a `files` table keyed by
//! absolute path, plus a `scan_runs` history written by the scanner.

pub mod database;
pub mod location;
pub mod record;
pub mod session;
pub mod signature;

pub use database::{Inventory, InventoryError, NameMatch};
pub use location::{inventory_file_name, inventory_label, inventory_path, list_inventories};
pub use record::{FileRecord, StoredState};
pub use session::{ScanReport, ScanRun};
pub use signature::{FileSignature, OwnerLookup};
