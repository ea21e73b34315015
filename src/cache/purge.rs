//! Best-effort deletion sweeps over the cache root.

use super::pattern::{MatchMode, ModelId, ModelPattern};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Knobs shared by both sweeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurgeOptions {
    /// How entry names are compared in [`purge_model`]. Ignored by [`purge_all`].
    pub match_mode: MatchMode,
    /// Report what would be removed without touching the filesystem.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeFailure {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub error: String,
}

/// What a sweep did.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub root: PathBuf,
    /// `false` when the root did not exist; nothing was attempted.
    pub root_exists: bool,
    pub dry_run: bool,
    /// Entries deleted (or, in a dry run, that would have been).
    pub removed: Vec<RemovedEntry>,
    /// Deletions that were attempted and failed.
    pub failures: Vec<PurgeFailure>,
    /// The root exists but could not be listed; nothing was attempted.
    pub listing_error: Option<String>,
}

impl PurgeReport {
    fn new(root: &Path, options: PurgeOptions) -> Self {
        Self {
            root: root.to_path_buf(),
            root_exists: root.exists(),
            dry_run: options.dry_run,
            removed: Vec::new(),
            failures: Vec::new(),
            listing_error: None,
        }
    }

    /// At least one deletion succeeded.
    pub fn removed_any(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Filesystem operations a sweep performs. Swapped out in tests to inject
/// failures.
pub(crate) trait Remover {
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

pub(crate) struct FsRemover;

impl Remover for FsRemover {
    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Delete every direct child of `root`.
///
/// Directories are removed with their contents, anything else (files,
/// symlinks) with a single unlink. A failure is logged, recorded in
/// [`PurgeReport::failures`] and the next entry is attempted.
pub fn purge_all(root: &Path, options: PurgeOptions) -> PurgeReport {
    purge_all_with(root, options, &FsRemover)
}

pub(crate) fn purge_all_with(root: &Path, options: PurgeOptions, remover: &dyn Remover) -> PurgeReport {
    let mut report = PurgeReport::new(root, options);
    if !report.root_exists {
        debug!("Cache directory not found: {}", root.display());
        return report;
    }

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list {}: {}", root.display(), e);
            report.listing_error = Some(e.to_string());
            return report;
        }
    };

    let mut children: Vec<(PathBuf, EntryKind)> = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => {
                let kind = entry_kind(&entry);
                children.push((entry.path(), kind));
            }
            Err(e) => warn!("Skipping unreadable entry in {}: {}", root.display(), e),
        }
    }
    children.sort();

    for (path, kind) in children {
        remove_entry(path, kind, options, remover, &mut report);
    }

    if !report.removed_any() {
        debug!("No cached files or directories found in {}", root.display());
    }
    report
}

/// Delete every entry under `root` whose name matches `model`'s pattern.
///
/// The tree is walked bottom-up: a directory's children are visited before
/// the directory itself, so a matching directory is removed after any
/// matching entries inside it. Symlinks are not followed. Unreadable
/// directories are skipped with a warning.
pub fn purge_model(root: &Path, model: &ModelId, options: PurgeOptions) -> PurgeReport {
    purge_model_with(root, model, options, &FsRemover)
}

pub(crate) fn purge_model_with(
    root: &Path,
    model: &ModelId,
    options: PurgeOptions,
    remover: &dyn Remover,
) -> PurgeReport {
    let mut report = PurgeReport::new(root, options);
    if !report.root_exists {
        debug!("Cache directory not found: {}", root.display());
        return report;
    }

    let pattern = model.pattern(options.match_mode);
    debug!(
        "Sweeping {} for '{}' ({:?})",
        root.display(),
        pattern.as_str(),
        pattern.mode()
    );
    sweep(root, &pattern, options, remover, &mut report);

    if !report.removed_any() {
        debug!(
            "No cached files or directories found for model '{}' in {}",
            model,
            root.display()
        );
    }
    report
}

fn sweep(
    dir: &Path,
    pattern: &ModelPattern,
    options: PurgeOptions,
    remover: &dyn Remover,
    report: &mut PurgeReport,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if dir == report.root.as_path() => {
            warn!("Cannot list {}: {}", dir.display(), e);
            report.listing_error = Some(e.to_string());
            return;
        }
        Err(e) => {
            warn!("Skipping unreadable directory {}: {}", dir.display(), e);
            return;
        }
    };

    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => match entry_kind(&entry) {
                EntryKind::Directory => dirs.push(entry.path()),
                EntryKind::File => files.push(entry.path()),
            },
            Err(e) => warn!("Skipping unreadable entry in {}: {}", dir.display(), e),
        }
    }
    dirs.sort();
    files.sort();

    for sub in &dirs {
        sweep(sub, pattern, options, remover, report);
    }

    for sub in dirs {
        if name_matches(&sub, pattern) {
            remove_entry(sub, EntryKind::Directory, options, remover, report);
        }
    }
    for file in files {
        if name_matches(&file, pattern) {
            remove_entry(file, EntryKind::File, options, remover, report);
        }
    }
}

fn name_matches(path: &Path, pattern: &ModelPattern) -> bool {
    path.file_name()
        .map(|n| pattern.matches(&n.to_string_lossy()))
        .unwrap_or(false)
}

/// Symlinks count as files: they are unlinked, never followed.
fn entry_kind(entry: &fs::DirEntry) -> EntryKind {
    match entry.file_type() {
        Ok(ft) if ft.is_dir() => EntryKind::Directory,
        _ => EntryKind::File,
    }
}

fn remove_entry(
    path: PathBuf,
    kind: EntryKind,
    options: PurgeOptions,
    remover: &dyn Remover,
    report: &mut PurgeReport,
) {
    let label = match kind {
        EntryKind::Directory => "directory",
        EntryKind::File => "file",
    };

    if options.dry_run {
        debug!("Would delete {}: {}", label, path.display());
        report.removed.push(RemovedEntry { path, kind });
        return;
    }

    let result = match kind {
        EntryKind::Directory => remover.remove_dir_all(&path),
        EntryKind::File => remover.remove_file(&path),
    };
    match result {
        Ok(()) => {
            debug!("Deleted {}: {}", label, path.display());
            report.removed.push(RemovedEntry { path, kind });
        }
        Err(e) => {
            warn!("Error deleting {} {}: {}", label, path.display(), e);
            report.failures.push(PurgeFailure {
                path,
                kind,
                error: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Fails for any path whose file name is in `fail_names`, records every
    /// attempt, delegates the rest to the real filesystem.
    struct FlakyRemover {
        fail_names: Vec<&'static str>,
        attempts: RefCell<Vec<String>>,
    }

    impl FlakyRemover {
        fn new(fail_names: Vec<&'static str>) -> Self {
            Self {
                fail_names,
                attempts: RefCell::new(Vec::new()),
            }
        }

        fn check(&self, path: &Path) -> io::Result<()> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            self.attempts.borrow_mut().push(name.clone());
            if self.fail_names.contains(&name.as_str()) {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
            } else {
                Ok(())
            }
        }
    }

    impl Remover for FlakyRemover {
        fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            self.check(path)?;
            fs::remove_dir_all(path)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.check(path)?;
            fs::remove_file(path)
        }
    }

    fn hub_fixture() -> TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for repo in ["models--Org--Name", "models--Org--OtherName"] {
            fs::create_dir_all(root.join(repo).join("snapshots").join("abc")).unwrap();
            fs::write(root.join(repo).join("snapshots/abc/config.json"), "{}").unwrap();
        }
        fs::create_dir_all(root.join(".locks").join("models--Org--Name")).unwrap();
        fs::write(root.join("version.txt"), "1").unwrap();
        tmp
    }

    #[test]
    fn purge_all_attempts_every_entry_after_a_failure() {
        let tmp = hub_fixture();
        let remover = FlakyRemover::new(vec![".locks"]);

        let report = purge_all_with(tmp.path(), PurgeOptions::default(), &remover);

        // .locks sorts first and fails; the remaining three are still attempted.
        assert_eq!(remover.attempts.borrow().len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.removed.len(), 3);
        assert!(tmp.path().join(".locks").exists());
        assert!(!tmp.path().join("version.txt").exists());
    }

    #[test]
    fn purge_model_keeps_going_after_a_failure() {
        let tmp = hub_fixture();
        // Both entries named models--Org--Name fail; each one is still attempted.
        let remover = FlakyRemover::new(vec!["models--Org--Name"]);
        let id = ModelId::parse("Org/Name").unwrap();

        let report = purge_model_with(tmp.path(), &id, PurgeOptions::default(), &remover);

        assert_eq!(report.failures.len(), 2);
        assert_eq!(remover.attempts.borrow().len(), 2);
        assert!(!report.removed_any());
        assert!(tmp.path().join("models--Org--OtherName").exists());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = hub_fixture();
        let options = PurgeOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = purge_all(tmp.path(), options);

        assert!(report.dry_run);
        assert_eq!(report.removed.len(), 4);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 4);
    }

    #[test]
    fn bottom_up_walk_reports_nested_match_before_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let outer = tmp.path().join("models--Org--Name");
        fs::create_dir_all(&outer).unwrap();
        fs::write(outer.join("Org--Name.lock"), "").unwrap();
        let id = ModelId::parse("Org/Name").unwrap();

        let report = purge_model(tmp.path(), &id, PurgeOptions::default());

        let kinds: Vec<EntryKind> = report.removed.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![EntryKind::File, EntryKind::Directory]);
        assert!(!outer.exists());
    }

    #[test]
    fn unlistable_root_is_not_a_deletion_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("hub");
        fs::write(&root, "not a directory").unwrap();
        let id = ModelId::parse("Org/Name").unwrap();

        for report in [
            purge_all(&root, PurgeOptions::default()),
            purge_model(&root, &id, PurgeOptions::default()),
        ] {
            assert!(report.root_exists);
            assert!(report.listing_error.is_some());
            assert!(report.failures.is_empty());
            assert!(!report.removed_any());
        }
        assert!(root.exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_unlinked_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        let keep = tempfile::tempdir().unwrap();
        fs::write(keep.path().join("weights.bin"), "w").unwrap();
        std::os::unix::fs::symlink(keep.path(), tmp.path().join("models--Org--Name")).unwrap();
        let id = ModelId::parse("Org/Name").unwrap();

        let report = purge_model(tmp.path(), &id, PurgeOptions::default());

        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.removed[0].kind, EntryKind::File);
        assert!(keep.path().join("weights.bin").exists());
    }
}
