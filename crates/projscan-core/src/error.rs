//! Error types for scanning operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while setting up or feeding a scan.
///
/// These never cross `ProjectScanner::scan`; every failure there resolves to a
/// `ScanOutcome`. They surface from constructors and from [`ScanSource`]
/// implementations.
///
/// [`ScanSource`]: crate::ScanSource
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// An ignore pattern could not be compiled.
    #[error("Invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The worker pool could not be started.
    #[error("Failed to start worker pool: {message}")]
    PoolBuild { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Check whether this error means the path simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory.
    ReadError,
    /// An ignore file could not be read.
    IgnoreFile,
    /// An ignore pattern could not be compiled.
    Pattern,
}

/// Non-fatal warning encountered during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning for a directory that could not be listed.
    pub fn read_error(path: impl Into<PathBuf>, error: &ScanError) -> Self {
        let kind = match error {
            ScanError::PermissionDenied { .. } => WarningKind::PermissionDenied,
            _ => WarningKind::ReadError,
        };
        Self {
            path: path.into(),
            message: error.to_string(),
            kind,
        }
    }

    /// Create a warning for an ignore file that could not be read.
    pub fn ignore_file(path: impl Into<PathBuf>, error: &ScanError) -> Self {
        let path = path.into();
        Self {
            message: format!("Unreadable ignore file: {error}"),
            path,
            kind: WarningKind::IgnoreFile,
        }
    }

    /// Create a warning for an ignore pattern that failed to compile.
    pub fn pattern(path: impl Into<PathBuf>, line: usize, pattern: &str, reason: &str) -> Self {
        Self {
            path: path.into(),
            message: format!("line {line}: skipped pattern `{pattern}`: {reason}"),
            kind: WarningKind::Pattern,
        }
    }
}
