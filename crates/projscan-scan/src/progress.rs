//! Scan progress reporting.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::session::ScanSession;

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Identity of the root being scanned.
    pub root_key: String,
    /// Number of files collected so far.
    pub files_scanned: u64,
    /// Number of directories entered so far.
    pub dirs_scanned: u64,
    /// Path of the most recently collected file.
    pub current_path: PathBuf,
    /// Number of warnings encountered.
    pub errors_count: u64,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
    /// Set on the last update of a scan.
    pub finished: bool,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new(root_key: impl Into<String>) -> Self {
        Self {
            root_key: root_key.into(),
            files_scanned: 0,
            dirs_scanned: 0,
            current_path: PathBuf::new(),
            errors_count: 0,
            elapsed: Duration::ZERO,
            finished: false,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items scanned (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }
}

/// Publishes snapshots of a session to subscribers.
#[derive(Debug, Clone)]
pub(crate) struct ProgressSink {
    tx: broadcast::Sender<ScanProgress>,
    root_key: String,
    interval: usize,
}

impl ProgressSink {
    pub(crate) fn new(
        tx: broadcast::Sender<ScanProgress>,
        root_key: impl Into<String>,
        interval: usize,
    ) -> Self {
        Self {
            tx,
            root_key: root_key.into(),
            interval,
        }
    }

    /// Publish if `count` files is a multiple of the interval.
    pub(crate) fn file_collected(&self, session: &ScanSession, count: usize, path: &Path) {
        if self.interval == 0 || count % self.interval != 0 {
            return;
        }
        self.publish(session, path, false);
    }

    /// Publish the final snapshot.
    pub(crate) fn finish(&self, session: &ScanSession) {
        self.publish(session, Path::new(""), true);
    }

    fn publish(&self, session: &ScanSession, path: &Path, finished: bool) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        // Sending only fails when every receiver is gone.
        let _ = self.tx.send(ScanProgress {
            root_key: self.root_key.clone(),
            files_scanned: session.files_visited() as u64,
            dirs_scanned: session.directories_visited() as u64,
            current_path: path.to_path_buf(),
            errors_count: session.warning_count() as u64,
            elapsed: session.elapsed(),
            finished,
        });
    }
}
