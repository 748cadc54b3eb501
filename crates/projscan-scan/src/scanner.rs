//! Scanner service with a shared pool and result cache.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, bounded};
use tokio::sync::broadcast;

use projscan_core::{
    CancelReason, FileEntry, Freshness, ScanError, ScanLimits, ScanOutcome, ScanSource, ScanStats,
    ScanStatus, ScanWarning, ScannerConfig, WarningKind,
};
use projscan_ignore::IgnoreEngine;

use crate::cache::ScanCache;
use crate::fs::LocalFs;
use crate::pool::{WorkerPool, panic_message};
use crate::progress::{ProgressSink, ScanProgress};
use crate::session::{CancelHandle, ScanSession};
use crate::walker::ConcurrentWalker;

/// Capacity of the progress broadcast channel.
const PROGRESS_CAPACITY: usize = 100;

/// Gitignore-aware project scanner.
///
/// A scanner owns a bounded worker pool and a cache of completed scans keyed
/// by root. It is meant to be created once and shared; every call to
/// [`scan`](ProjectScanner::scan) runs its own session on the shared pool.
///
/// `scan` never returns an error: timeouts, cancellations and failures all
/// resolve to an outcome with an empty file list.
#[derive(Debug)]
pub struct ProjectScanner {
    config: ScannerConfig,
    pool: WorkerPool,
    cache: ScanCache,
    stop: CancelHandle,
    progress_tx: broadcast::Sender<ScanProgress>,
    active: AtomicUsize,
}

/// Decrements the active scan count when a scan returns.
struct ActiveScan<'a>(&'a AtomicUsize);

impl<'a> ActiveScan<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for ActiveScan<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ProjectScanner {
    /// Create a scanner and start its worker pool.
    pub fn new(config: ScannerConfig) -> Result<Self, ScanError> {
        config
            .limits
            .validate()
            .map_err(|message| ScanError::InvalidConfig { message })?;

        let pool = WorkerPool::new(config.worker_count())?;
        let (progress_tx, _) = broadcast::channel(PROGRESS_CAPACITY);

        Ok(Self {
            config,
            pool,
            cache: ScanCache::new(),
            stop: CancelHandle::new(),
            progress_tx,
            active: AtomicUsize::new(0),
        })
    }

    /// Create a scanner with the default configuration.
    pub fn with_defaults() -> Result<Self, ScanError> {
        Self::new(ScannerConfig::default())
    }

    /// The configuration this scanner was built with.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.pool.threads()
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// The result cache.
    pub fn cache(&self) -> &ScanCache {
        &self.cache
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        tracing::debug!(entries = self.cache.len(), "Clearing scan cache");
        self.cache.invalidate_all();
    }

    /// A handle that stops in-flight and future scans from outside.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.stop.clone()
    }

    /// Number of scans currently running.
    pub fn active_scans(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Check if [`shutdown`](ProjectScanner::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.stop.is_shut_down()
    }

    /// Scan a local directory.
    ///
    /// Fails only when `path` cannot be opened as a directory.
    pub fn scan_path(&self, path: impl AsRef<Path>) -> Result<ScanOutcome, ScanError> {
        let source = LocalFs::new(path)?;
        Ok(self.scan(Arc::new(source)))
    }

    /// Scan a source with the configured limits.
    pub fn scan(&self, source: Arc<dyn ScanSource>) -> ScanOutcome {
        self.scan_with_limits(source, &self.config.limits)
    }

    /// Scan a source with explicit limits.
    ///
    /// A result produced at the root's current freshness is served from the
    /// cache. Only completed scans are cached, including those truncated by a
    /// count ceiling.
    pub fn scan_with_limits(&self, source: Arc<dyn ScanSource>, limits: &ScanLimits) -> ScanOutcome {
        let start = Instant::now();
        let root_key = source.root_key();
        let _active = ActiveScan::enter(&self.active);

        if self.stop.is_shut_down() {
            tracing::warn!(root = %root_key, "Scan requested after shutdown");
            return stopped(root_key, CancelReason::Shutdown, start);
        }

        if let Err(message) = limits.validate() {
            tracing::warn!(root = %root_key, "Invalid scan limits: {message}");
            let mut outcome = ScanOutcome::empty(root_key.as_str(), ScanStatus::Failed);
            outcome.warnings.push(ScanWarning::new(
                source.root(),
                ScanError::InvalidConfig { message }.to_string(),
                WarningKind::ReadError,
            ));
            outcome.stats.elapsed = start.elapsed();
            return outcome;
        }

        let freshness = match source.freshness() {
            Ok(freshness) => Some(freshness),
            Err(err) => {
                tracing::warn!(root = %root_key, "Cannot read freshness, result will not be cached: {err}");
                None
            }
        };

        if let Some(files) = freshness.and_then(|f| self.cache.lookup_fresh(&root_key, f)) {
            tracing::debug!(root = %root_key, files = files.len(), "Cache hit");
            return ScanOutcome::cached(root_key, files, start.elapsed());
        }
        tracing::debug!(root = %root_key, "Cache miss, scanning");

        let Some(pool) = self.pool.get() else {
            return stopped(root_key, CancelReason::Shutdown, start);
        };

        let session = Arc::new(ScanSession::new(limits.clone(), self.stop.clone()));
        let progress = ProgressSink::new(
            self.progress_tx.clone(),
            root_key.as_str(),
            self.config.progress_interval,
        );

        let (done_tx, done_rx) = bounded::<()>(1);
        {
            let source = Arc::clone(&source);
            let session = Arc::clone(&session);
            let job_pool = Arc::clone(&pool);
            let progress = progress.clone();
            let ignore_file_name = self.config.ignore_file_name.clone();

            pool.spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    let engine = IgnoreEngine::load(source.as_ref(), &ignore_file_name);
                    for warning in engine.warnings() {
                        session.push_warning(warning.clone());
                    }
                    let walker = ConcurrentWalker::build(
                        source,
                        engine,
                        Arc::clone(&session),
                        job_pool,
                        Some(progress),
                    );
                    walker.walk();
                }));
                if let Err(payload) = result {
                    session.fail(CancelReason::Panic, panic_message(payload.as_ref()));
                }
                let _ = done_tx.send(());
            });
        }
        drop(pool);

        match done_rx.recv_timeout(limits.overall_timeout) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => {
                session.cancel(CancelReason::Deadline);
                tracing::warn!(
                    root = %root_key,
                    timeout_ms = limits.overall_timeout.as_millis() as u64,
                    "Scan timed out"
                );
            }
            Err(RecvTimeoutError::Disconnected) => {
                // The job was dropped unrun, which only happens when the pool stops.
                session.cancel(CancelReason::Shutdown);
            }
        }

        let outcome = self.finish(root_key, &session, freshness, start);
        progress.finish(&session);
        outcome
    }

    fn finish(
        &self,
        root_key: String,
        session: &ScanSession,
        freshness: Option<Freshness>,
        start: Instant,
    ) -> ScanOutcome {
        let reason = session.cancel_reason();
        let mut status = reason.map_or(ScanStatus::Completed, CancelReason::status);
        if status == ScanStatus::Completed && session.failure().is_some() {
            status = ScanStatus::Failed;
        }

        let mut outcome = ScanOutcome::empty(root_key, status);
        outcome.cancel_reason = reason;
        outcome.warnings = session.take_warnings();
        outcome.stats = ScanStats {
            files_visited: session.files_visited() as u64,
            directories_visited: session.directories_visited() as u64,
            files_matched: 0,
            elapsed: start.elapsed(),
        };

        if status != ScanStatus::Completed {
            match session.failure() {
                Some(message) => tracing::error!(root = %outcome.root_key, "Scan failed: {message}"),
                None => tracing::warn!(
                    root = %outcome.root_key,
                    status = %status,
                    reason = ?reason,
                    "Scan did not complete, discarding partial results"
                ),
            }
            return outcome;
        }

        let mut files = session.take_files();
        files.sort_unstable_by(|a, b| a.relative.cmp(&b.relative));
        let files: Arc<[FileEntry]> = files.into();

        outcome.truncated = reason.is_some_and(CancelReason::is_truncation);
        outcome.stats.files_matched = files.len() as u64;

        if let Some(freshness) = freshness {
            self.cache.put(outcome.root_key.as_str(), freshness, Arc::clone(&files));
        }
        outcome.files = files;

        tracing::debug!(
            root = %outcome.root_key,
            files = outcome.files.len(),
            directories = outcome.stats.directories_visited,
            truncated = outcome.truncated,
            elapsed_ms = outcome.stats.elapsed.as_millis() as u64,
            "Scan completed"
        );

        outcome
    }

    /// Stop the scanner.
    ///
    /// In-flight scans are cancelled and return promptly; later calls to
    /// [`scan`](ProjectScanner::scan) return a cancelled outcome. Waits up to
    /// `grace` for worker threads to exit and returns whether they all did.
    /// Workers still busy after the grace period are left to wind down on
    /// their own. Calling this more than once is harmless.
    pub fn shutdown(&self, grace: Duration) -> bool {
        if !self.stop.is_shut_down() {
            tracing::info!(active = self.active_scans(), "Shutting down scanner");
        }
        self.stop.shut_down();
        self.pool.shutdown(grace)
    }
}

fn stopped(root_key: String, reason: CancelReason, start: Instant) -> ScanOutcome {
    let mut outcome = ScanOutcome::empty(root_key, reason.status());
    outcome.cancel_reason = Some(reason);
    outcome.stats.elapsed = start.elapsed();
    outcome
}
