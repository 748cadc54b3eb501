//! Freshness-keyed cache of completed scans.

use std::sync::Arc;

use dashmap::DashMap;

use projscan_core::{FileEntry, Freshness};

/// A completed scan kept for reuse.
#[derive(Debug, Clone)]
pub struct CachedScan {
    /// Freshness of the root captured before the scan started.
    pub freshness: Freshness,
    /// The files the scan produced.
    pub files: Arc<[FileEntry]>,
}

/// Scan results keyed by root identity.
///
/// An entry is only valid while the root's freshness stamp compares equal to
/// the stored one; there is no time-based expiry.
#[derive(Debug, Default)]
pub struct ScanCache {
    entries: DashMap<String, CachedScan>,
}

impl ScanCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the stored entry for a root, fresh or not.
    pub fn get(&self, root_key: &str) -> Option<CachedScan> {
        self.entries.get(root_key).map(|entry| entry.value().clone())
    }

    /// Get the stored files if they were produced at `current` freshness.
    pub fn lookup_fresh(&self, root_key: &str, current: Freshness) -> Option<Arc<[FileEntry]>> {
        self.entries
            .get(root_key)
            .filter(|entry| entry.freshness == current)
            .map(|entry| Arc::clone(&entry.files))
    }

    /// Store a completed scan, replacing any previous entry for the root.
    pub fn put(&self, root_key: impl Into<String>, freshness: Freshness, files: Arc<[FileEntry]>) {
        self.entries
            .insert(root_key.into(), CachedScan { freshness, files });
    }

    /// Drop the entry for one root. Returns whether one existed.
    pub fn invalidate(&self, root_key: &str) -> bool {
        self.entries.remove(root_key).is_some()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Number of cached roots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
