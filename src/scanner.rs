use crate::checksum::{checksum_file, HashAlgorithm};
use crate::ignore::IgnoreSet;
use crate::inventory::database::{insert_record, lookup_state, update_content};
use crate::inventory::signature::path_key;
use crate::inventory::{FileSignature, Inventory, OwnerLookup, ScanReport, ScanRun};
use crate::scan_events::ScanEvent;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// What to scan and how
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root: PathBuf,
    pub algorithm: HashAlgorithm,
    /// Trust matching size and mtime instead of re-hashing tracked files
    pub quick: bool,
    /// Report changes without writing anything
    pub dry_run: bool,
    pub ignore: IgnoreSet,
}

impl ScanOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            algorithm: HashAlgorithm::default(),
            quick: false,
            dry_run: false,
            ignore: IgnoreSet::empty(),
        }
    }
}

/// State carried through one walk
struct ScanContext<'a> {
    options: &'a ScanOptions,
    owners: OwnerLookup,
    report: ScanReport,
    seen: HashSet<String>,
}

/// Walk `options.root` and reconcile every regular file against `inventory`
///
/// Files of each directory are written in one transaction. Unreadable files
/// are reported through `on_event` and skipped; storage errors abort the scan.
/// After the walk, tracked paths that were not seen and no longer exist are
/// reported missing but kept.
pub fn scan_tree(
    inventory: &mut Inventory,
    options: &ScanOptions,
    on_event: &mut dyn FnMut(&ScanEvent),
) -> Result<ScanReport> {
    if !options.root.is_dir() {
        bail!("Invalid root directory: {}", options.root.display());
    }
    let root = options
        .root
        .canonicalize()
        .with_context(|| format!("Failed to resolve root directory: {}", options.root.display()))?;

    let started_at = Utc::now();
    let mut ctx = ScanContext {
        options,
        owners: OwnerLookup::new(),
        report: ScanReport::default(),
        seen: HashSet::new(),
    };

    tracing::debug!(
        "Scanning {} into {} ({}{})",
        root.display(),
        inventory.path().display(),
        options.algorithm,
        if options.quick { ", quick" } else { "" }
    );
    if !options.ignore.patterns().is_empty() {
        tracing::debug!("Ignore patterns: {}", options.ignore.patterns().join(", "));
    }

    let mut ignored = 0usize;
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by(files_before_directories)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() > 0 && options.ignore.is_ignored(entry.file_name()) {
                tracing::debug!("Ignoring {}", entry.path().display());
                ignored += 1;
                false
            } else {
                true
            }
        });

    // Sorting puts a directory's files right after it, so `pending` only ever
    // holds the files of the directory entered last.
    let mut pending: Vec<DirEntry> = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.clone());
                skip_unreadable(&mut ctx, path, err.to_string(), on_event);
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            reconcile_directory(inventory, &mut pending, &mut ctx, on_event)?;
            ctx.report.folders += 1;
            on_event(&ScanEvent::DirectoryEntered {
                path: entry.path().to_path_buf(),
                folders: ctx.report.folders,
                files: ctx.report.files,
            });
        } else if file_type.is_file() {
            pending.push(entry);
        }
    }
    reconcile_directory(inventory, &mut pending, &mut ctx, on_event)?;
    ctx.report.ignored = ignored;

    for (full_path, file_name) in inventory.tracked_paths()? {
        if ctx.seen.contains(&full_path) || Path::new(&full_path).exists() {
            continue;
        }
        ctx.report.missing += 1;
        emit(
            on_event,
            ScanEvent::Missing {
                file_name,
                path: PathBuf::from(full_path),
            },
        );
    }

    if !options.dry_run {
        let run = ScanRun::finished(
            started_at,
            root.display().to_string(),
            options.algorithm.to_string(),
            ctx.report.clone(),
        );
        inventory.record_run(&run)?;
    }

    Ok(ctx.report)
}

fn files_before_directories(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Reconcile one directory's files in a single transaction
fn reconcile_directory(
    inventory: &mut Inventory,
    pending: &mut Vec<DirEntry>,
    ctx: &mut ScanContext<'_>,
    on_event: &mut dyn FnMut(&ScanEvent),
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let files = std::mem::take(pending);

    inventory.batch(|conn| {
        for entry in &files {
            reconcile_file(conn, entry.path(), ctx, on_event)?;
        }
        Ok(())
    })
}

fn reconcile_file(
    conn: &Connection,
    path: &Path,
    ctx: &mut ScanContext<'_>,
    on_event: &mut dyn FnMut(&ScanEvent),
) -> Result<()> {
    ctx.report.files += 1;
    // Records are keyed by path text; a lossy key would merge distinct files
    if path.to_str().is_none() {
        skip_unreadable(ctx, path.to_path_buf(), "path is not valid UTF-8".to_string(), on_event);
        return Ok(());
    }
    let key = path_key(path);
    ctx.seen.insert(key.clone());

    let sig = match FileSignature::from_path(path, &ctx.owners) {
        Ok(sig) => sig,
        Err(e) => {
            skip_unreadable(ctx, path.to_path_buf(), format!("{:#}", e), on_event);
            return Ok(());
        }
    };

    let stored = lookup_state(conn, &key)?;

    if let Some(state) = &stored {
        if ctx.options.quick && state.metadata_matches(sig.size_i64(), sig.modified) {
            ctx.report.unchanged += 1;
            return Ok(());
        }
    }

    let checksum = match checksum_file(path, ctx.options.algorithm) {
        Ok(checksum) => checksum,
        Err(e) => {
            skip_unreadable(ctx, path.to_path_buf(), format!("{:#}", e), on_event);
            return Ok(());
        }
    };

    match stored {
        None => {
            if !ctx.options.dry_run {
                insert_record(conn, &sig, &checksum)?;
            }
            ctx.report.added += 1;
            emit(
                on_event,
                ScanEvent::Added {
                    file_name: sig.file_name.clone(),
                    path: sig.path.clone(),
                },
            );
        }
        Some(state) if state.checksum.as_deref() != Some(checksum.as_str()) => {
            if !ctx.options.dry_run {
                update_content(conn, &sig, &checksum)?;
            }
            ctx.report.changed += 1;
            emit(
                on_event,
                ScanEvent::Changed {
                    file_name: sig.file_name.clone(),
                    path: sig.path.clone(),
                },
            );
        }
        // Matching content is never rewritten, even if the file was touched
        Some(_) => ctx.report.unchanged += 1,
    }

    Ok(())
}

fn skip_unreadable(
    ctx: &mut ScanContext<'_>,
    path: PathBuf,
    reason: String,
    on_event: &mut dyn FnMut(&ScanEvent),
) {
    ctx.report.errors += 1;
    emit(on_event, ScanEvent::Unreadable { path, reason });
}

/// Pass an outcome to the caller and the audit log
fn emit(on_event: &mut dyn FnMut(&ScanEvent), event: ScanEvent) {
    if let Some(status) = event.status() {
        match &event {
            ScanEvent::Unreadable { path, reason } => {
                tracing::info!(target: "filetrack::audit", "[{:<10}] {} ({})", status, path.display(), reason);
            }
            ScanEvent::Added { path, .. }
            | ScanEvent::Changed { path, .. }
            | ScanEvent::Missing { path, .. } => {
                tracing::info!(target: "filetrack::audit", "[{:<10}] {}", status, path.display());
            }
            ScanEvent::DirectoryEntered { .. } => {}
        }
    }
    on_event(&event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        root: PathBuf,
        inventory: Inventory,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tree");
        fs::create_dir(&root).unwrap();
        let root = root.canonicalize().unwrap();
        let inventory = Inventory::open_or_create(&temp_dir.path().join("inv.db")).unwrap();
        Fixture {
            _temp_dir: temp_dir,
            root,
            inventory,
        }
    }

    fn run(fx: &mut Fixture, options: &ScanOptions) -> (ScanReport, Vec<ScanEvent>) {
        let mut events = Vec::new();
        let report = scan_tree(&mut fx.inventory, options, &mut |e| events.push(e.clone())).unwrap();
        let outcomes = events.into_iter().filter(|e| e.status().is_some()).collect();
        (report, outcomes)
    }

    fn stored_checksum(fx: &Fixture, path: &Path) -> String {
        fx.inventory
            .record(&path_key(path))
            .unwrap()
            .unwrap()
            .checksum
    }

    #[test]
    fn test_single_file_is_added() {
        let mut fx = fixture();
        fs::write(fx.root.join("a.txt"), "hello").unwrap();

        let options = ScanOptions::new(&fx.root);
        let (report, events) = run(&mut fx, &options);

        assert_eq!(
            events,
            vec![ScanEvent::Added {
                file_name: "a.txt".to_string(),
                path: fx.root.join("a.txt"),
            }]
        );
        assert_eq!(report.folders, 1);
        assert_eq!(report.files, 1);
        assert_eq!(report.added, 1);
        assert_eq!(report.changed, 0);
        assert_eq!(report.missing, 0);
        assert_eq!(
            stored_checksum(&fx, &fx.root.join("a.txt")),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let mut fx = fixture();
        fs::create_dir(fx.root.join("sub")).unwrap();
        fs::write(fx.root.join("a.txt"), "hello").unwrap();
        fs::write(fx.root.join("sub").join("b.txt"), "world").unwrap();
        let options = ScanOptions::new(&fx.root);

        let (first, _) = run(&mut fx, &options);
        assert_eq!(first.added, 2);
        let before = stored_checksum(&fx, &fx.root.join("sub").join("b.txt"));

        let (second, events) = run(&mut fx, &options);
        assert!(events.is_empty());
        assert_eq!(second.unchanged, 2);
        assert!(second.is_clean());
        assert_eq!(second.folders, 2);
        assert_eq!(stored_checksum(&fx, &fx.root.join("sub").join("b.txt")), before);
    }

    #[test]
    fn test_changed_content_reported_once() {
        let mut fx = fixture();
        let file = fx.root.join("a.txt");
        fs::write(&file, "hello").unwrap();
        let options = ScanOptions::new(&fx.root);
        run(&mut fx, &options);

        fs::write(&file, "goodbye").unwrap();
        let (report, events) = run(&mut fx, &options);
        assert_eq!(report.changed, 1);
        assert_eq!(
            events,
            vec![ScanEvent::Changed {
                file_name: "a.txt".to_string(),
                path: file.clone(),
            }]
        );
        assert_eq!(
            stored_checksum(&fx, &file),
            checksum_file(&file, HashAlgorithm::Sha256).unwrap()
        );

        let (again, events) = run(&mut fx, &options);
        assert_eq!(again.changed, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_removed_file_is_missing_and_kept() {
        let mut fx = fixture();
        let file = fx.root.join("gone.txt");
        fs::write(&file, "bye").unwrap();
        fs::write(fx.root.join("stay.txt"), "hi").unwrap();
        let options = ScanOptions::new(&fx.root);
        run(&mut fx, &options);

        fs::remove_file(&file).unwrap();
        let (report, events) = run(&mut fx, &options);

        assert_eq!(report.missing, 1);
        assert_eq!(
            events,
            vec![ScanEvent::Missing {
                file_name: "gone.txt".to_string(),
                path: file.clone(),
            }]
        );
        assert!(fx.inventory.record(&path_key(&file)).unwrap().is_some());
        assert_eq!(fx.inventory.count().unwrap(), 2);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut fx = fixture();
        fs::write(fx.root.join("a.txt"), "hello").unwrap();
        let mut options = ScanOptions::new(&fx.root);
        options.dry_run = true;

        let (report, events) = run(&mut fx, &options);
        assert_eq!(report.added, 1);
        assert_eq!(events.len(), 1);
        assert_eq!(fx.inventory.count().unwrap(), 0);
        assert!(fx.inventory.last_run().unwrap().is_none());
    }

    #[test]
    fn test_scan_run_is_recorded() {
        let mut fx = fixture();
        fs::write(fx.root.join("a.txt"), "hello").unwrap();
        let options = ScanOptions::new(&fx.root);
        let (report, _) = run(&mut fx, &options);

        let last = fx.inventory.last_run().unwrap().unwrap();
        assert_eq!(last.report, report);
        assert_eq!(last.algorithm, "sha256");
        assert_eq!(last.root, fx.root.display().to_string());
    }

    #[test]
    fn test_quick_mode_trusts_metadata() {
        let mut fx = fixture();
        let file = fx.root.join("a.txt");
        fs::write(&file, "hello").unwrap();
        let options = ScanOptions::new(&fx.root);
        run(&mut fx, &options);

        // Same size, same mtime, different bytes
        let mtime = fs::metadata(&file).unwrap().modified().unwrap();
        fs::write(&file, "jello").unwrap();
        fs::File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let mut quick = options.clone();
        quick.quick = true;
        let (report, events) = run(&mut fx, &quick);
        assert!(events.is_empty());
        assert_eq!(report.unchanged, 1);

        let (report, _) = run(&mut fx, &options);
        assert_eq!(report.changed, 1);
    }

    #[test]
    fn test_touched_file_keeps_stored_record() {
        let mut fx = fixture();
        let file = fx.root.join("a.txt");
        fs::write(&file, "hello").unwrap();
        let options = ScanOptions::new(&fx.root);
        run(&mut fx, &options);
        let before = fx.inventory.record(&path_key(&file)).unwrap().unwrap();

        let later = fs::metadata(&file).unwrap().modified().unwrap()
            + std::time::Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let (report, events) = run(&mut fx, &options);
        assert!(events.is_empty());
        assert_eq!(report.unchanged, 1);
        let after = fx.inventory.record(&path_key(&file)).unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn test_ignored_names_are_skipped() {
        let mut fx = fixture();
        fs::write(fx.root.join(".DS_Store"), "junk").unwrap();
        fs::create_dir(fx.root.join("cache")).unwrap();
        fs::write(fx.root.join("cache").join("blob"), "junk").unwrap();
        fs::write(fx.root.join("keep.txt"), "data").unwrap();
        let mut options = ScanOptions::new(&fx.root);
        options.ignore = IgnoreSet::new(&[".DS_Store", "cache"]).unwrap();

        let (report, events) = run(&mut fx, &options);
        assert_eq!(report.ignored, 2);
        assert_eq!(report.files, 1);
        assert_eq!(report.folders, 1);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_blake3_checksums() {
        let mut fx = fixture();
        let file = fx.root.join("a.txt");
        fs::write(&file, "hello").unwrap();
        let mut options = ScanOptions::new(&fx.root);
        options.algorithm = HashAlgorithm::Blake3;

        run(&mut fx, &options);
        assert_eq!(
            stored_checksum(&fx, &file),
            blake3::hash(b"hello").to_hex().to_string()
        );
    }

    #[test]
    fn test_invalid_root() {
        let mut fx = fixture();
        let options = ScanOptions::new(fx.root.join("does-not-exist"));
        let result = scan_tree(&mut fx.inventory, &options, &mut |_| {});
        assert!(result.is_err());
        assert!(fx.inventory.last_run().unwrap().is_none());
    }

    #[test]
    fn test_counts_nested_folders() {
        let mut fx = fixture();
        fs::create_dir_all(fx.root.join("a").join("b")).unwrap();
        fs::create_dir(fx.root.join("c")).unwrap();
        fs::write(fx.root.join("a").join("b").join("deep.txt"), "x").unwrap();
        fs::write(fx.root.join("c").join("one.txt"), "y").unwrap();
        fs::write(fx.root.join("top.txt"), "z").unwrap();

        let options = ScanOptions::new(&fx.root);
        let (report, _) = run(&mut fx, &options);
        assert_eq!(report.folders, 4);
        assert_eq!(report.files, 3);
        assert_eq!(report.added, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let mut fx = fixture();
        let locked = fx.root.join("locked.txt");
        fs::write(&locked, "secret").unwrap();
        fs::write(fx.root.join("open.txt"), "public").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        if fs::File::open(&locked).is_ok() {
            // Running with privileges that ignore permission bits
            return;
        }

        let options = ScanOptions::new(&fx.root);
        let (report, events) = run(&mut fx, &options);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(report.errors, 1);
        assert_eq!(report.added, 1);
        assert_eq!(report.files, 2);
        assert!(fx.inventory.record(&path_key(&locked)).unwrap().is_none());
        assert!(events
            .iter()
            .any(|e| matches!(e, ScanEvent::Unreadable { path, .. } if *path == locked)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut fx = fixture();
        fs::write(fx.root.join(OsStr::from_bytes(b"a\xff")), "one").unwrap();
        fs::write(fx.root.join(OsStr::from_bytes(b"a\xfe")), "two").unwrap();
        fs::write(fx.root.join("plain.txt"), "three").unwrap();
        let options = ScanOptions::new(&fx.root);

        let (first, events) = run(&mut fx, &options);
        assert_eq!(first.added, 1);
        assert_eq!(first.errors, 2);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ScanEvent::Unreadable { .. }))
                .count(),
            2
        );
        assert_eq!(fx.inventory.count().unwrap(), 1);

        let (second, _) = run(&mut fx, &options);
        assert_eq!(second.added, 0);
        assert_eq!(second.changed, 0);
        assert_eq!(second.unchanged, 1);
        assert_eq!(second.errors, 2);
    }
}
