//! Integration tests for acl-walker
//!
//! These tests build synthetic trees with tempfile and exercise the full
//! walk through the public API. Security payloads are platform-dependent,
//! so assertions here focus on traversal semantics: completeness, depth,
//! filtering, dedup, cancellation, and record invariants.

use acl_walker::{enumerate, enumerate_paths, EnumerateOptions, SearchFor};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn options_with(search_for: SearchFor, workers: usize) -> EnumerateOptions {
    EnumerateOptions {
        search_for,
        worker_count: workers,
        ..Default::default()
    }
}

fn collect_paths(root: &Path, options: EnumerateOptions) -> Vec<String> {
    enumerate(root, options).unwrap().map(|e| e.path).collect()
}

fn path_str(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().into_owned()
}

/// Standard fixture: T/{a.txt, b.txt, sub/c.txt}
fn build_basic_tree(root: &Path) {
    fs::write(root.join("a.txt"), b"a").unwrap();
    fs::write(root.join("b.txt"), b"b").unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("c.txt"), b"c").unwrap();
}

#[test]
fn test_files_completeness() {
    let dir = tempdir().unwrap();
    build_basic_tree(dir.path());

    let paths: HashSet<String> = collect_paths(dir.path(), options_with(SearchFor::Files, 4))
        .into_iter()
        .collect();

    let expected: HashSet<String> = [
        path_str(dir.path().join("a.txt")),
        path_str(dir.path().join("b.txt")),
        path_str(dir.path().join("sub").join("c.txt")),
    ]
    .into_iter()
    .collect();

    assert_eq!(paths, expected);
}

#[test]
fn test_dirs_only() {
    let dir = tempdir().unwrap();
    build_basic_tree(dir.path());

    let paths: HashSet<String> = collect_paths(dir.path(), options_with(SearchFor::Dirs, 4))
        .into_iter()
        .collect();

    let expected: HashSet<String> = [path_str(dir.path().join("sub"))].into_iter().collect();
    assert_eq!(paths, expected);
}

#[test]
fn test_empty_directory_yields_nothing() {
    let dir = tempdir().unwrap();

    let paths = collect_paths(dir.path(), options_with(SearchFor::Files, 2));
    assert!(paths.is_empty());
}

#[test]
fn test_max_depth_zero_emits_immediate_children_only() {
    let dir = tempdir().unwrap();
    build_basic_tree(dir.path());

    let options = EnumerateOptions {
        max_depth: Some(0),
        ..options_with(SearchFor::Both, 4)
    };
    let paths: HashSet<String> = collect_paths(dir.path(), options).into_iter().collect();

    let expected: HashSet<String> = [
        path_str(dir.path().join("a.txt")),
        path_str(dir.path().join("b.txt")),
        path_str(dir.path().join("sub")),
    ]
    .into_iter()
    .collect();

    assert_eq!(paths, expected);
}

#[test]
fn test_depth_cap_is_hard() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::create_dir_all(dir.path().join("sub").join("deep")).unwrap();
    fs::write(dir.path().join("sub").join("b.txt"), b"b").unwrap();
    fs::write(dir.path().join("sub").join("deep").join("c.txt"), b"c").unwrap();

    let options = EnumerateOptions {
        max_depth: Some(1),
        ..options_with(SearchFor::Files, 4)
    };
    let paths: HashSet<String> = collect_paths(dir.path(), options).into_iter().collect();

    assert!(paths.contains(&path_str(dir.path().join("a.txt"))));
    assert!(paths.contains(&path_str(dir.path().join("sub").join("b.txt"))));
    assert!(!paths.contains(&path_str(dir.path().join("sub").join("deep").join("c.txt"))));
}

#[test]
fn test_thumbs_db_never_emitted() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("real.txt"), b"x").unwrap();
    fs::write(dir.path().join("Thumbs.db"), b"x").unwrap();
    // A directory named like the thumbnail index is neither emitted nor
    // descended into
    fs::create_dir(dir.path().join("thumbs.db")).unwrap();
    fs::write(dir.path().join("thumbs.db").join("inner.txt"), b"x").unwrap();

    let paths: HashSet<String> = collect_paths(dir.path(), options_with(SearchFor::Both, 4))
        .into_iter()
        .collect();

    let expected: HashSet<String> = [path_str(dir.path().join("real.txt"))]
        .into_iter()
        .collect();
    assert_eq!(paths, expected);
}

#[test]
fn test_no_duplicates() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        let sub = dir.path().join(format!("sub{}", i));
        fs::create_dir(&sub).unwrap();
        for j in 0..5 {
            fs::write(sub.join(format!("f{}.txt", j)), b"x").unwrap();
        }
    }

    let paths = collect_paths(dir.path(), options_with(SearchFor::Both, 8));
    let unique: HashSet<&String> = paths.iter().collect();
    assert_eq!(paths.len(), unique.len());
    assert_eq!(paths.len(), 20 + 20 * 5);
}

#[test]
fn test_output_set_invariant_under_worker_count() {
    let dir = tempdir().unwrap();
    for i in 0..8 {
        let sub = dir.path().join(format!("d{}", i));
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("leaf.txt"), b"x").unwrap();
        fs::create_dir(sub.join("nested")).unwrap();
        fs::write(sub.join("nested").join("deep.txt"), b"x").unwrap();
    }

    let mut sets = Vec::new();
    for workers in [1, 2, 8] {
        let paths: HashSet<String> =
            collect_paths(dir.path(), options_with(SearchFor::Both, workers))
                .into_iter()
                .collect();
        sets.push(paths);
    }

    assert_eq!(sets[0], sets[1]);
    assert_eq!(sets[1], sets[2]);
}

#[test]
fn test_search_pattern_filters_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), b"x").unwrap();
    fs::write(dir.path().join("skip.log"), b"x").unwrap();

    let options = EnumerateOptions {
        search_pattern: "*.txt".to_string(),
        ..options_with(SearchFor::Files, 2)
    };
    let paths: HashSet<String> = collect_paths(dir.path(), options).into_iter().collect();

    let expected: HashSet<String> = [path_str(dir.path().join("keep.txt"))]
        .into_iter()
        .collect();
    assert_eq!(paths, expected);
}

#[test]
fn test_cancellation_ends_stream() {
    let dir = tempdir().unwrap();
    for i in 0..50 {
        fs::write(dir.path().join(format!("f{}.txt", i)), b"x").unwrap();
    }

    let options = options_with(SearchFor::Files, 2);
    let cancel = options.cancellation.clone();

    let stream = enumerate(dir.path(), options).unwrap();
    cancel.cancel();

    // The stream must reach end-of-stream; entries already in the channel
    // may still be delivered
    let count = stream.count();
    assert!(count <= 50);
}

#[test]
fn test_dropping_unconsumed_stream_quiesces() {
    let dir = tempdir().unwrap();
    build_basic_tree(dir.path());

    let stream = enumerate(dir.path(), options_with(SearchFor::Files, 4)).unwrap();
    drop(stream);
}

#[test]
fn test_stats_match_output() {
    let dir = tempdir().unwrap();
    build_basic_tree(dir.path());

    let mut stream = enumerate(dir.path(), options_with(SearchFor::Both, 4)).unwrap();
    let count = stream.by_ref().count() as u64;
    let stats = stream.stats();

    assert_eq!(stats.entries_emitted(), count);
    assert_eq!(stats.files_emitted, 3);
    assert_eq!(stats.dirs_emitted, 1);
    // Root plus one subdirectory were iterated
    assert_eq!(stats.dirs_processed, 2);
}

#[test]
fn test_record_invariants_hold() {
    let dir = tempdir().unwrap();
    build_basic_tree(dir.path());

    for entry in enumerate(dir.path(), options_with(SearchFor::Both, 4)).unwrap() {
        assert!(!entry.path.trim().is_empty());
        if entry.error.is_empty() {
            assert!(entry.modified);
        } else {
            assert!(!entry.modified);
            assert!(entry.owner.is_empty());
            assert!(entry.acl.is_empty());
        }
    }
}

#[test]
fn test_enumerate_paths_matches_enumerate() {
    let dir = tempdir().unwrap();
    build_basic_tree(dir.path());

    let full: HashSet<String> = collect_paths(dir.path(), options_with(SearchFor::Files, 4))
        .into_iter()
        .collect();
    let bare: HashSet<String> =
        enumerate_paths(dir.path(), options_with(SearchFor::Files, 4))
            .unwrap()
            .collect();

    assert_eq!(full, bare);
}

#[test]
fn test_root_validation() {
    assert!(enumerate("", EnumerateOptions::default()).is_err());
    assert!(enumerate("   ", EnumerateOptions::default()).is_err());
    assert!(enumerate("no/such/root/anywhere", EnumerateOptions::default()).is_err());
}

#[cfg(unix)]
#[test]
fn test_unreadable_subtree_does_not_reduce_readable_entries() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let ok = dir.path().join("ok");
    fs::create_dir(&ok).unwrap();
    fs::write(ok.join("x.txt"), b"x").unwrap();
    fs::write(ok.join("y.txt"), b"y").unwrap();

    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("secret.txt"), b"s").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let paths: HashSet<String> = collect_paths(dir.path(), options_with(SearchFor::Files, 4))
        .into_iter()
        .collect();

    // Restore permissions so the tempdir can be cleaned up
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(paths.contains(&path_str(ok.join("x.txt"))));
    assert!(paths.contains(&path_str(ok.join("y.txt"))));
}
