//! Cache sweeps against real temporary directory trees.

use edgequake_pdf2tex::cache::EntryKind;
use edgequake_pdf2tex::{purge_all, purge_model, resolve_cache_root, MatchMode, ModelId, PurgeOptions};
use std::fs;
use std::path::Path;

/// A small hub cache with two repositories of the same org, one dataset and
/// the lock directory the hub client leaves behind.
fn hub_fixture(root: &Path) {
    for repo in [
        "models--Org--Name",
        "models--Org--OtherName",
        "datasets--Org--Name",
    ] {
        let snap = root.join(repo).join("snapshots").join("abc123");
        fs::create_dir_all(&snap).unwrap();
        fs::write(snap.join("config.json"), b"{}").unwrap();
        fs::create_dir_all(root.join(repo).join("blobs")).unwrap();
        fs::write(root.join(repo).join("refs"), b"main").unwrap();
    }
    fs::create_dir_all(root.join(".locks").join("models--Org--Name")).unwrap();
    fs::write(root.join("version.txt"), b"1").unwrap();
}

fn names(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    v.sort();
    v
}

#[test]
fn purge_all_empties_the_root() {
    let tmp = tempfile::tempdir().unwrap();
    hub_fixture(tmp.path());

    let report = purge_all(tmp.path(), PurgeOptions::default());

    assert!(report.root_exists);
    assert!(report.failures.is_empty());
    assert_eq!(report.removed.len(), 5);
    assert!(names(tmp.path()).is_empty());
    assert!(tmp.path().exists(), "the root itself is kept");

    let files: Vec<_> = report
        .removed
        .iter()
        .filter(|e| e.kind == EntryKind::File)
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].path.ends_with("version.txt"));
}

#[test]
fn purge_all_on_empty_root_removes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let report = purge_all(tmp.path(), PurgeOptions::default());
    assert!(report.root_exists);
    assert!(!report.removed_any());
}

#[test]
fn purge_all_on_missing_root_reports_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("hub");

    let report = purge_all(&root, PurgeOptions::default());

    assert!(!report.root_exists);
    assert!(report.removed.is_empty());
    assert!(report.failures.is_empty());
    assert!(!root.exists(), "a missing root is not created");
}

#[test]
fn targeted_purge_leaves_sibling_models() {
    let tmp = tempfile::tempdir().unwrap();
    hub_fixture(tmp.path());
    let model = ModelId::parse("Org/Name").unwrap();

    let report = purge_model(tmp.path(), &model, PurgeOptions::default());

    assert!(report.failures.is_empty());
    assert_eq!(
        names(tmp.path()),
        vec![".locks", "models--Org--OtherName", "version.txt"]
    );
    assert!(names(&tmp.path().join(".locks")).is_empty());
    assert!(tmp
        .path()
        .join("models--Org--OtherName/snapshots/abc123/config.json")
        .exists());
}

#[test]
fn substring_mode_also_takes_longer_names() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("models--Org--Name")).unwrap();
    fs::create_dir_all(tmp.path().join("models--Org--Name-v2")).unwrap();
    let model = ModelId::parse("Org/Name").unwrap();

    purge_model(tmp.path(), &model, PurgeOptions::default());

    assert!(names(tmp.path()).is_empty());
}

#[test]
fn exact_mode_spares_longer_names() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("models--Org--Name")).unwrap();
    fs::create_dir_all(tmp.path().join("models--Org--Name-v2")).unwrap();
    let model = ModelId::parse("Org/Name").unwrap();
    let options = PurgeOptions {
        match_mode: MatchMode::Exact,
        ..PurgeOptions::default()
    };

    let report = purge_model(tmp.path(), &model, options);

    assert_eq!(report.removed.len(), 1);
    assert_eq!(names(tmp.path()), vec!["models--Org--Name-v2"]);
}

#[test]
fn targeted_purge_on_missing_root_deletes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let model = ModelId::parse("Org/Name").unwrap();

    let report = purge_model(&tmp.path().join("absent"), &model, PurgeOptions::default());

    assert!(!report.root_exists);
    assert!(!report.removed_any());
}

#[test]
fn dry_run_lists_matches_and_keeps_them() {
    let tmp = tempfile::tempdir().unwrap();
    hub_fixture(tmp.path());
    let before = names(tmp.path());
    let options = PurgeOptions {
        dry_run: true,
        ..PurgeOptions::default()
    };

    let model = ModelId::parse("Org/Name").unwrap();
    let targeted = purge_model(tmp.path(), &model, options);
    let full = purge_all(tmp.path(), options);

    assert!(targeted.dry_run && full.dry_run);
    assert_eq!(targeted.removed.len(), 3);
    assert_eq!(full.removed.len(), 5);
    assert_eq!(names(tmp.path()), before);
    assert!(tmp.path().join(".locks/models--Org--Name").exists());
}

#[test]
fn explicit_cache_dir_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let root = resolve_cache_root(Some(tmp.path())).unwrap();
    assert_eq!(root, tmp.path());
}

#[test]
fn report_serialises_for_json_output() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("models--Org--Name")).unwrap();

    let report = purge_all(tmp.path(), PurgeOptions::default());
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["root_exists"], true);
    assert_eq!(json["removed"][0]["kind"], "directory");
    assert_eq!(json["failures"].as_array().unwrap().len(), 0);
    assert!(json["listing_error"].is_null());
}
