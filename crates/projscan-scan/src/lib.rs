//! Concurrent project scanning for projscan.
//!
//! This crate walks a [`ScanSource`] on a bounded worker pool, filters every
//! entry through an [`IgnoreEngine`](projscan_ignore::IgnoreEngine), and
//! caches completed results keyed by the root's freshness stamp.
//!
//! # Overview
//!
//! - **Bounded traversal** via a shared rayon pool, with file, directory and
//!   depth ceilings
//! - **Deadlines** for the whole scan and for each large directory's batches
//! - **Cooperative cancellation** through a shared [`CancelHandle`]
//! - **Progress updates** via broadcast channels
//! - **Caching** of completed scans until the root changes
//!
//! # Example
//!
//! ```rust,no_run
//! use projscan_scan::ProjectScanner;
//!
//! let scanner = ProjectScanner::with_defaults().unwrap();
//! let outcome = scanner.scan_path("/path/to/project").unwrap();
//!
//! println!("{}: {} files", outcome.status, outcome.len());
//! ```
//!
//! # Progress Monitoring
//!
//! Subscribe to real-time progress updates:
//!
//! ```rust,no_run
//! use projscan_scan::ProjectScanner;
//!
//! let scanner = ProjectScanner::with_defaults().unwrap();
//! let mut progress_rx = scanner.subscribe();
//!
//! // Handle progress in a separate task
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Scanned {} files", progress.files_scanned);
//!     }
//! });
//! ```

mod cache;
mod fs;
mod pool;
mod progress;
mod scanner;
mod session;
mod walker;

pub use cache::{CachedScan, ScanCache};
pub use fs::LocalFs;
pub use progress::ScanProgress;
pub use scanner::ProjectScanner;
pub use session::{CancelHandle, MAX_WARNINGS, ScanSession};
pub use walker::ConcurrentWalker;

// Re-export core types for convenience
pub use projscan_core::{
    CancelReason, FileEntry, Freshness, MemoryTree, ScanError, ScanLimits, ScanOutcome,
    ScanSource, ScanStats, ScanStatus, ScanWarning, ScannerConfig, SourceEntry, WarningKind,
};
