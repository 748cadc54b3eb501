//! Core types and traits for projscan.
//!
//! This crate provides the fundamental data structures shared by the ignore
//! engine and the scanner: configuration and limits, error types, the file
//! entries a scan produces, scan outcomes, and the [`ScanSource`] abstraction
//! over a readable directory tree.

mod config;
mod entry;
mod error;
mod memory;
mod outcome;
mod source;

pub use config::{ScanLimits, ScanLimitsBuilder, ScannerConfig, ScannerConfigBuilder};
pub use entry::{FileEntry, Freshness, SourceEntry, relative_path};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use memory::MemoryTree;
pub use outcome::{CancelReason, ScanOutcome, ScanStats, ScanStatus};
pub use source::ScanSource;
