//! Per-scan shared state and cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use projscan_core::{CancelReason, FileEntry, ScanLimits, ScanWarning};

/// Warnings kept per scan; later ones are counted but dropped.
pub const MAX_WARNINGS: usize = 256;

const RUNNING: u8 = 0;
const EXTERNAL: u8 = 1;
const SHUTDOWN: u8 = 2;

/// Service-wide stop switch shared by every scan of a scanner.
///
/// An external stop can be lifted again with [`reset`](CancelHandle::reset);
/// a shutdown is permanent.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<AtomicU8>,
}

impl CancelHandle {
    /// Create a handle in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop all in-flight and future scans until [`reset`](CancelHandle::reset).
    pub fn cancel(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, EXTERNAL, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Lift an external stop. Has no effect after shutdown.
    pub fn reset(&self) {
        let _ = self
            .state
            .compare_exchange(EXTERNAL, RUNNING, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Check if scans should stop.
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) != RUNNING
    }

    /// Check if the owning service has shut down.
    pub fn is_shut_down(&self) -> bool {
        self.state.load(Ordering::Acquire) == SHUTDOWN
    }

    pub(crate) fn shut_down(&self) {
        self.state.store(SHUTDOWN, Ordering::Release);
    }

    /// Reason matching the current state, if stopped.
    pub fn reason(&self) -> Option<CancelReason> {
        match self.state.load(Ordering::Acquire) {
            EXTERNAL => Some(CancelReason::External),
            SHUTDOWN => Some(CancelReason::Shutdown),
            _ => None,
        }
    }
}

/// Mutable state shared by all units of work of one scan.
///
/// The two counters, the cancellation flag and the result bag are the only
/// things traversal units share; everything else is local to a unit.
#[derive(Debug)]
pub struct ScanSession {
    limits: ScanLimits,
    stop: CancelHandle,
    files_visited: AtomicUsize,
    directories_visited: AtomicUsize,
    cancelled: AtomicBool,
    reason: Mutex<Option<CancelReason>>,
    failure: Mutex<Option<String>>,
    files: Mutex<Vec<FileEntry>>,
    warnings: Mutex<Vec<ScanWarning>>,
    dropped_warnings: AtomicUsize,
    started: Instant,
}

impl ScanSession {
    /// Create a session bounded by `limits` and stopped by `stop`.
    pub fn new(limits: ScanLimits, stop: CancelHandle) -> Self {
        Self {
            limits,
            stop,
            files_visited: AtomicUsize::new(0),
            directories_visited: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            reason: Mutex::new(None),
            failure: Mutex::new(None),
            files: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
            dropped_warnings: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// Limits this session runs under.
    pub fn limits(&self) -> &ScanLimits {
        &self.limits
    }

    /// Check whether traversal should stop.
    ///
    /// A stop requested through the service's [`CancelHandle`] is latched into
    /// the session whenever it is observed, even after a count ceiling.
    pub fn is_cancelled(&self) -> bool {
        if let Some(reason) = self.stop.reason() {
            self.cancel(reason);
            return true;
        }
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancel the session.
    ///
    /// The first reason is kept, except that a terminal reason replaces a
    /// count ceiling. Returns `true` if this call recorded `reason`.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        let recorded = {
            let mut slot = self.reason.lock();
            let replace = match *slot {
                None => true,
                Some(current) => current.is_truncation() && !reason.is_truncation(),
            };
            if replace {
                *slot = Some(reason);
            }
            replace
        };
        self.cancelled.store(true, Ordering::Release);
        recorded
    }

    /// The first cancellation reason, if cancelled.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        *self.reason.lock()
    }

    /// Record a failure and stop the scan.
    ///
    /// Only the first message is kept.
    pub fn fail(&self, reason: CancelReason, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(reason = %reason, "Scan failed: {message}");
        self.failure.lock().get_or_insert(message);
        self.cancel(reason);
    }

    /// Message of the first recorded failure.
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// Reserve a slot for a directory.
    ///
    /// Fails and cancels the session once `max_directories` have been entered.
    pub fn try_enter_directory(&self) -> bool {
        let max = self.limits.max_directories;
        let reserved = self
            .directories_visited
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .is_ok();
        if !reserved && self.cancel(CancelReason::MaxDirectories) {
            tracing::warn!(max_directories = max, "Directory limit reached, truncating scan");
        }
        reserved
    }

    /// Add a file to the result bag.
    ///
    /// The file count never exceeds `max_files`; the session is cancelled as
    /// soon as the ceiling is reached. Returns the new count, or `None` when
    /// the file was dropped.
    pub fn try_add_file(&self, entry: FileEntry) -> Option<usize> {
        let max = self.limits.max_files;
        let previous = self
            .files_visited
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()?;

        self.files.lock().push(entry);

        let count = previous + 1;
        if count >= max && self.cancel(CancelReason::MaxFiles) {
            tracing::warn!(max_files = max, "File limit reached, truncating scan");
        }
        Some(count)
    }

    /// Keep a non-fatal warning.
    pub fn push_warning(&self, warning: ScanWarning) {
        let mut warnings = self.warnings.lock();
        if warnings.len() < MAX_WARNINGS {
            warnings.push(warning);
        } else {
            self.dropped_warnings.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Files collected so far.
    pub fn files_visited(&self) -> usize {
        self.files_visited.load(Ordering::Acquire)
    }

    /// Directories entered so far.
    pub fn directories_visited(&self) -> usize {
        self.directories_visited.load(Ordering::Acquire)
    }

    /// Number of warnings recorded, including dropped ones.
    pub fn warning_count(&self) -> usize {
        self.warnings.lock().len() + self.dropped_warnings.load(Ordering::Relaxed)
    }

    /// Time since the session was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Take the collected files, leaving the bag empty.
    pub fn take_files(&self) -> Vec<FileEntry> {
        std::mem::take(&mut *self.files.lock())
    }

    /// Take the recorded warnings.
    pub fn take_warnings(&self) -> Vec<ScanWarning> {
        std::mem::take(&mut *self.warnings.lock())
    }
}
