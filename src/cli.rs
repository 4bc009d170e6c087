use anyhow::{bail, Result};
use chrono::Local;
use clap::{ArgAction, Parser};
use colored::*;
use std::path::PathBuf;

use crate::checksum::HashAlgorithm;
use crate::config::Config;
use crate::finder::{self, FindOutcome};
use crate::inventory::{inventory_file_name, Inventory, NameMatch};
use crate::logging;
use crate::output::{self, OutputMode};
use crate::progress;
use crate::prompt::prompt_for;
use crate::reporter;
use crate::scan_events::ScanEvent;
use crate::scanner::{scan_tree, ScanOptions};

#[derive(Parser)]
#[command(name = "ftscan")]
#[command(version)]
#[command(about = "Record checksums and metadata of every file under a directory")]
#[command(long_about = "Walks a directory tree and reconciles every file against a named \
    inventory: new files are added, files whose content changed are flagged, and \
    tracked files that disappeared are reported missing.\n\n\
    Examples:\n  \
    ftscan --db photos --root ~/Pictures        # Scan into photos.db\n  \
    ftscan --db photos --root ~/Pictures --quick # Skip hashing unchanged files\n  \
    ftscan --db photos --root ~/Pictures --dry-run")]
pub struct ScanCli {
    /// Inventory name (prompted for when omitted)
    #[arg(short = 'd', long = "db", value_name = "NAME")]
    pub db: Option<String>,

    /// Directory to scan (prompted for when omitted)
    #[arg(short = 'r', long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Checksum algorithm [default: from config, else sha256]
    #[arg(short = 'a', long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,

    /// Trust unchanged size and modification time instead of re-hashing
    #[arg(long)]
    pub quick: bool,

    /// Report what would change without writing to the inventory
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Extra name pattern to skip (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Do not write an audit log for this run
    #[arg(long)]
    pub no_log: bool,

    /// Increase output verbosity (-v full paths and info logs, -vv debug logs)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print only the summary
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl ScanCli {
    pub fn run(self) -> Result<()> {
        let mut config = Config::load()?;
        let inventory_dir = config.inventory_dir()?;

        let name = match self.db {
            Some(name) => name,
            None => prompt_for("Database name")?,
        };
        let root = match self.root {
            Some(root) => root,
            None => PathBuf::from(prompt_for("Root directory")?),
        };
        if !root.is_dir() {
            bail!("Invalid root directory: {}", root.display());
        }

        let file_name = inventory_file_name(&name);
        let inventory_path = inventory_dir.join(&file_name);

        let audit_log = if config.scan.write_log && !self.no_log && !self.dry_run {
            Some(logging::audit_log_path(&config.log_dir()?, &file_name, Local::now()))
        } else {
            None
        };
        logging::init(self.verbose, audit_log.as_deref())?;
        if let Some(ref path) = audit_log {
            tracing::info!("Writing audit log to {}", path.display());
        }

        config.scan.ignore.extend(self.ignore);
        let mut options = ScanOptions::new(&root);
        options.algorithm = self.algorithm.unwrap_or(config.scan.algorithm);
        options.quick = self.quick;
        options.dry_run = self.dry_run;
        options.ignore = config.ignore_set()?;

        // A dry run must not create or alter the inventory file
        let mut inventory = if !self.dry_run {
            Inventory::open_or_create(&inventory_path)?
        } else if inventory_path.is_file() {
            Inventory::open_existing(&inventory_path)?
        } else {
            Inventory::open_in_memory()?
        };

        let mode = OutputMode::from_flags(self.quiet, self.verbose);
        let spinner = progress::create_spinner("Scanning...");
        let result = scan_tree(&mut inventory, &options, &mut |event: &ScanEvent| {
            if let ScanEvent::DirectoryEntered {
                path,
                folders,
                files,
            } = event
            {
                progress::update_scan(&spinner, path, *folders, *files);
                return;
            }
            if let Some(line) = output::format_status(event, mode) {
                spinner.suspend(|| println!("{}", line));
            }
            if let Some(warning) = output::format_warning(event) {
                spinner.suspend(|| eprintln!("{}", warning));
            }
        });
        progress::finish_and_clear(&spinner);
        let report = result?;

        println!("{}", output::format_summary(&report));
        if self.dry_run {
            println!("{}", "Dry run: nothing was written.".dimmed());
        }
        Ok(())
    }
}

#[derive(Parser)]
#[command(name = "ftfind")]
#[command(version)]
#[command(about = "Find a file by name in one or all inventories")]
pub struct FindCli {
    /// File name to look for
    #[arg(short = 'f', long = "file", value_name = "NAME")]
    pub file: String,

    /// Search only this inventory
    #[arg(short = 'd', long = "db", value_name = "NAME")]
    pub db: Option<String>,

    /// Match any file name containing NAME
    #[arg(long)]
    pub partial: bool,

    /// One line per match: <inventory>: <path>
    #[arg(long, conflicts_with = "json")]
    pub brief: bool,

    /// Print matches as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl FindCli {
    pub fn run(self) -> Result<()> {
        logging::init(self.verbose, None)?;
        let config = Config::load()?;
        let dir = config.inventory_dir()?;

        let mode = if self.partial {
            NameMatch::Partial
        } else {
            NameMatch::Exact
        };
        let outcome = match self.db {
            Some(ref db) => finder::find_in_named(&dir, db, &self.file, mode)?,
            None => finder::find_in_all(&dir, &self.file, mode)?,
        };

        for skipped in &outcome.skipped {
            eprintln!(
                "{} Skipping {}: {}",
                "Warning:".yellow(),
                skipped.inventory.display(),
                skipped.reason
            );
        }

        if self.json {
            println!("{}", output::to_json(&outcome.matches)?);
            return Ok(());
        }
        if outcome.searched == 0 {
            println!("No inventories found in {}", dir.display());
            return Ok(());
        }
        if !outcome.found() {
            println!("File Not Found");
            return Ok(());
        }

        self.print_matches(&outcome);
        Ok(())
    }

    fn print_matches(&self, outcome: &FindOutcome) {
        for found in &outcome.matches {
            if self.brief {
                println!("{}: {}", found.inventory, found.record.full_path);
            } else {
                println!("Database: {}", found.inventory.bold());
                println!("{}", output::format_record(&found.record));
                println!();
            }
        }
    }
}

#[derive(Parser)]
#[command(name = "ftreport")]
#[command(version)]
#[command(about = "List every record of an inventory, sorted by file name")]
pub struct ReportCli {
    /// Inventory name (prompted for when omitted)
    #[arg(short = 'd', long = "db", value_name = "NAME")]
    pub db: Option<String>,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the most recent scan run instead of the records
    #[arg(long)]
    pub last_run: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl ReportCli {
    pub fn run(self) -> Result<()> {
        logging::init(self.verbose, None)?;
        let config = Config::load()?;
        let dir = config.inventory_dir()?;

        let name = match self.db {
            Some(ref name) => name.clone(),
            None => prompt_for("Database name")?,
        };
        let inventory = reporter::open_inventory(&dir, &name)?;

        if self.last_run {
            match reporter::last_run(&inventory)? {
                Some(run) if self.json => println!("{}", output::to_json(&run)?),
                Some(run) => println!("{}", output::format_run(&run)),
                None => println!("No last run information stored."),
            }
            return Ok(());
        }

        let report = reporter::build_report(&inventory)?;
        if self.json {
            println!("{}", output::to_json(&report.records)?);
            return Ok(());
        }
        if report.is_empty() {
            println!("No records found.");
            return Ok(());
        }

        let separator = output::separator();
        for record in &report.records {
            println!("{}", output::format_record(record));
            println!("{}", separator);
        }
        Ok(())
    }
}
