//! File entries and freshness stamps.

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Opaque stamp describing the state of a scan root.
///
/// Only equality is meaningful: a cached result is reusable iff the root's
/// current stamp equals the stamp recorded when the result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Freshness(pub u128);

impl Freshness {
    /// Create a stamp from a raw value.
    pub fn new(value: u128) -> Self {
        Self(value)
    }

    /// Create a stamp from a modification time.
    pub fn from_modified(modified: SystemTime) -> Self {
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self(nanos)
    }
}

impl From<SystemTime> for Freshness {
    fn from(modified: SystemTime) -> Self {
        Self::from_modified(modified)
    }
}

/// A child entry as reported by a [`ScanSource`](crate::ScanSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Full path of the entry.
    pub path: PathBuf,
    /// Final path component.
    pub name: CompactString,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl SourceEntry {
    /// Create a file entry.
    pub fn file(path: impl Into<PathBuf>, size: u64, modified: SystemTime) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            is_dir: false,
            size,
            modified,
        }
    }

    /// Create a directory entry.
    pub fn directory(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            is_dir: true,
            size: 0,
            modified,
        }
    }
}

fn file_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_default()
}

/// A matched file produced by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Full path of the file.
    pub path: PathBuf,
    /// `/`-separated path relative to the scan root.
    pub relative: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl FileEntry {
    /// Build a file entry from a source entry and its root-relative path.
    pub fn from_source(entry: SourceEntry, relative: String) -> Self {
        Self {
            path: entry.path,
            relative,
            size: entry.size,
            modified: entry.modified,
        }
    }
}

/// Compute the `/`-separated path of `path` relative to `root`.
///
/// Returns `None` when `path` is not under `root`, and an empty string for the
/// root itself.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut out = String::new();
    for component in rel.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    Some(out)
}
