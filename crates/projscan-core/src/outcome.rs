//! Scan outcomes and statistics.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::entry::FileEntry;
use crate::error::ScanWarning;

/// Terminal state of a scan invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Traversal finished (possibly truncated by a count ceiling).
    Completed,
    /// The overall deadline or a batch wait elapsed.
    TimedOut,
    /// An unexpected error aborted the traversal.
    Failed,
    /// The scan was stopped from outside.
    Cancelled,
}

impl ScanStatus {
    /// Whether the outcome carries a usable file list.
    pub fn is_success(self) -> bool {
        matches!(self, ScanStatus::Completed)
    }
}

/// Why a scan session stopped producing work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The file ceiling was reached.
    MaxFiles,
    /// The directory ceiling was reached.
    MaxDirectories,
    /// A directory's batches did not finish in time.
    BatchTimeout,
    /// The overall deadline elapsed.
    Deadline,
    /// A caller requested cancellation.
    External,
    /// The scanner service is shutting down.
    Shutdown,
    /// A traversal unit panicked.
    Panic,
    /// The scan root could not be listed.
    RootUnreadable,
}

impl CancelReason {
    /// Count ceilings bound work; they do not fail the scan.
    pub fn is_truncation(self) -> bool {
        matches!(self, CancelReason::MaxFiles | CancelReason::MaxDirectories)
    }

    /// Status a scan ends with when this is its recorded cancellation reason.
    pub fn status(self) -> ScanStatus {
        match self {
            CancelReason::MaxFiles | CancelReason::MaxDirectories => ScanStatus::Completed,
            CancelReason::BatchTimeout | CancelReason::Deadline => ScanStatus::TimedOut,
            CancelReason::External | CancelReason::Shutdown => ScanStatus::Cancelled,
            CancelReason::Panic | CancelReason::RootUnreadable => ScanStatus::Failed,
        }
    }
}

/// Counters gathered during a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Files collected by the walker.
    pub files_visited: u64,
    /// Directories entered by the walker.
    pub directories_visited: u64,
    /// Files in the returned list.
    pub files_matched: u64,
    /// Wall time of the invocation.
    pub elapsed: Duration,
}

/// Result of one scan request.
///
/// Anything other than [`ScanStatus::Completed`] carries an empty file list:
/// callers treat it as "scan unavailable this time", never as "no files".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Identity of the scanned root.
    pub root_key: String,
    /// Terminal state.
    pub status: ScanStatus,
    /// Matched files (unordered).
    pub files: Arc<[FileEntry]>,
    /// Served from the cache without traversal.
    pub from_cache: bool,
    /// A count ceiling cut the traversal short.
    pub truncated: bool,
    /// First reason the session was cancelled, if any.
    pub cancel_reason: Option<CancelReason>,
    /// Scan statistics.
    pub stats: ScanStats,
    /// Non-fatal warnings.
    pub warnings: Vec<ScanWarning>,
}

impl ScanOutcome {
    /// An outcome with no files.
    pub fn empty(root_key: impl Into<String>, status: ScanStatus) -> Self {
        Self {
            root_key: root_key.into(),
            status,
            files: Arc::from(Vec::new()),
            from_cache: false,
            truncated: false,
            cancel_reason: None,
            stats: ScanStats::default(),
            warnings: Vec::new(),
        }
    }

    /// A successful outcome served from the cache.
    pub fn cached(root_key: impl Into<String>, files: Arc<[FileEntry]>, elapsed: Duration) -> Self {
        let files_matched = files.len() as u64;
        Self {
            root_key: root_key.into(),
            status: ScanStatus::Completed,
            files,
            from_cache: true,
            truncated: false,
            cancel_reason: None,
            stats: ScanStats {
                files_matched,
                elapsed,
                ..ScanStats::default()
            },
            warnings: Vec::new(),
        }
    }

    /// Whether the scan produced a usable file list.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Number of matched files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if no files were matched.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
