//! File inventory library crate
//!
//! Backs the `ftscan`, `ftfind` and `ftreport` binaries and can be used
//! directly to scan trees into SQLite inventories and query them.

pub mod checksum;
pub mod cli;
pub mod config;
pub mod finder;
pub mod ignore;
pub mod inventory;
pub mod logging;
pub mod output;
pub mod progress;
pub mod prompt;
pub mod reporter;
pub mod scan_events;
pub mod scanner;
