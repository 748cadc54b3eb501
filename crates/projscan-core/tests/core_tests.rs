use projscan_core::{
    CancelReason, FileEntry, Freshness, MemoryTree, ScanLimits, ScanOutcome, ScanSource,
    ScanStatus, ScannerConfig, SourceEntry, relative_path,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[test]
fn test_limits_deserialize_with_defaults() {
    let limits: ScanLimits = serde_json::from_str(r#"{ "max_files": 5, "overall_timeout_ms": 50 }"#).unwrap();

    assert_eq!(limits.max_files, 5);
    assert_eq!(limits.overall_timeout, Duration::from_millis(50));
    assert_eq!(limits.max_depth, 50);
    assert_eq!(limits.max_directories, 1_000);
    assert_eq!(limits.batch_wait_timeout, Duration::from_secs(15));
    assert_eq!(limits.batch_size, 20);
}

#[test]
fn test_limits_serialize_millis() {
    let json = serde_json::to_value(ScanLimits::default()).unwrap();

    assert_eq!(json["overall_timeout_ms"], 20_000);
    assert_eq!(json["batch_wait_timeout_ms"], 15_000);
}

#[test]
fn test_scanner_config_from_empty_json() {
    let config: ScannerConfig = serde_json::from_str("{}").unwrap();

    assert_eq!(config, ScannerConfig::default());
    assert_eq!(config.ignore_file_name, ".gitignore");
}

#[test]
fn test_scanner_config_nested_limits() {
    let config: ScannerConfig =
        serde_json::from_str(r#"{ "threads": 4, "limits": { "batch_size": 8 } }"#).unwrap();

    assert_eq!(config.threads, 4);
    assert_eq!(config.limits.batch_size, 8);
    assert_eq!(config.limits.max_files, 10_000);
}

#[test]
fn test_file_entry_from_source() {
    let modified = UNIX_EPOCH + Duration::from_secs(42);
    let source = SourceEntry::file("/p/src/a.rs", 12, modified);
    let entry = FileEntry::from_source(source, "src/a.rs".to_string());

    assert_eq!(entry.path, PathBuf::from("/p/src/a.rs"));
    assert_eq!(entry.relative, "src/a.rs");
    assert_eq!(entry.size, 12);
    assert_eq!(entry.modified, modified);
}

#[test]
fn test_relative_path_nested() {
    let root = Path::new("/p");
    assert_eq!(
        relative_path(root, Path::new("/p/a/b/c.txt")).as_deref(),
        Some("a/b/c.txt")
    );
}

#[test]
fn test_freshness_from_system_time() {
    let now = SystemTime::now();
    assert_eq!(Freshness::from(now), Freshness::from(now));
    assert_eq!(Freshness::from(UNIX_EPOCH), Freshness::new(0));
}

#[test]
fn test_outcome_cached_stats() {
    let files: Arc<[FileEntry]> = Arc::from(vec![FileEntry {
        path: PathBuf::from("/p/a"),
        relative: "a".to_string(),
        size: 1,
        modified: UNIX_EPOCH,
    }]);
    let outcome = ScanOutcome::cached("/p", files, Duration::from_millis(1));

    assert!(outcome.from_cache);
    assert!(outcome.is_success());
    assert_eq!(outcome.len(), 1);
    assert_eq!(outcome.stats.files_matched, 1);
    assert_eq!(outcome.stats.directories_visited, 0);
}

#[test]
fn test_outcome_serializes_status() {
    let mut outcome = ScanOutcome::empty("/p", ScanStatus::TimedOut);
    outcome.cancel_reason = Some(CancelReason::Deadline);

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "timed_out");
    assert_eq!(json["cancel_reason"], "deadline");
    assert_eq!(json["files"].as_array().unwrap().len(), 0);
}

#[test]
fn test_memory_tree_is_a_scan_source() {
    let tree: Arc<dyn ScanSource> =
        Arc::new(MemoryTree::new("/p").with_file("a/b/c.txt", "hello"));

    assert_eq!(tree.root_key(), "/p");
    let a = tree.read_dir(Path::new("/p/a")).unwrap();
    assert_eq!(a.len(), 1);
    assert!(a[0].is_dir);

    let c = tree.read_to_string(Path::new("/p/a/b/c.txt")).unwrap();
    assert_eq!(c, "hello");
}

#[test]
fn test_local_tree_through_default_discovery() {
    // A tempdir-backed source using only the required trait methods, to
    // exercise the default ignore file discovery against a real file system.
    struct Plain(PathBuf);

    impl ScanSource for Plain {
        fn root(&self) -> &Path {
            &self.0
        }
        fn freshness(&self) -> Result<Freshness, projscan_core::ScanError> {
            Ok(Freshness::new(0))
        }
        fn read_dir(&self, dir: &Path) -> Result<Vec<SourceEntry>, projscan_core::ScanError> {
            let mut out = Vec::new();
            for entry in std::fs::read_dir(dir).map_err(|e| projscan_core::ScanError::io(dir, e))? {
                let entry = entry.map_err(|e| projscan_core::ScanError::io(dir, e))?;
                let path = entry.path();
                if path.is_dir() {
                    out.push(SourceEntry::directory(path, UNIX_EPOCH));
                } else {
                    out.push(SourceEntry::file(path, 0, UNIX_EPOCH));
                }
            }
            Ok(out)
        }
        fn read_to_string(&self, file: &Path) -> Result<String, projscan_core::ScanError> {
            std::fs::read_to_string(file).map_err(|e| projscan_core::ScanError::io(file, e))
        }
    }

    let temp = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
    std::fs::write(temp.path().join(".gitignore"), "x\n").unwrap();
    std::fs::write(temp.path().join("a/b/.gitignore"), "y\n").unwrap();
    std::fs::write(temp.path().join("a/readme"), "").unwrap();

    let source = Plain(temp.path().to_path_buf());
    let mut found = source.ignore_files(".gitignore");
    found.sort();

    assert_eq!(
        found,
        vec![temp.path().join(".gitignore"), temp.path().join("a/b/.gitignore")]
    );
}
