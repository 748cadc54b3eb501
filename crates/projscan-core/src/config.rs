//! Scan configuration types.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default maximum recursion depth below the scan root.
pub const DEFAULT_MAX_DEPTH: usize = 50;
/// Default ceiling on collected files.
pub const DEFAULT_MAX_FILES: usize = 10_000;
/// Default ceiling on visited directories.
pub const DEFAULT_MAX_DIRECTORIES: usize = 1_000;
/// Default number of children handled by one unit of work.
pub const DEFAULT_BATCH_SIZE: usize = 20;
/// Default deadline for a whole scan.
pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(20);
/// Default deadline for one directory's batches to finish.
pub const DEFAULT_BATCH_WAIT_TIMEOUT: Duration = Duration::from_secs(15);
/// Default number of files between progress updates.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 500;
/// Default name of per-directory ignore files.
pub const DEFAULT_IGNORE_FILE_NAME: &str = ".gitignore";

/// Ceilings that bound a single scan invocation.
///
/// Limits are immutable for the lifetime of a scan session. Hitting a count
/// ceiling truncates the scan; elapsing a timeout fails it.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanLimits {
    /// Deepest directory level to descend into (root is depth 0).
    #[builder(default = "DEFAULT_MAX_DEPTH")]
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of files collected before the scan winds down.
    #[builder(default = "DEFAULT_MAX_FILES")]
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum number of directories visited before the scan winds down.
    #[builder(default = "DEFAULT_MAX_DIRECTORIES")]
    #[serde(default = "default_max_directories")]
    pub max_directories: usize,

    /// Deadline for the whole traversal.
    #[builder(default = "DEFAULT_OVERALL_TIMEOUT")]
    #[serde(
        rename = "overall_timeout_ms",
        with = "millis",
        default = "default_overall_timeout"
    )]
    pub overall_timeout: Duration,

    /// Deadline for the batches of a single large directory.
    #[builder(default = "DEFAULT_BATCH_WAIT_TIMEOUT")]
    #[serde(
        rename = "batch_wait_timeout_ms",
        with = "millis",
        default = "default_batch_wait_timeout"
    )]
    pub batch_wait_timeout: Duration,

    /// Directories with more children than this are split into parallel batches.
    #[builder(default = "DEFAULT_BATCH_SIZE")]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

fn default_max_directories() -> usize {
    DEFAULT_MAX_DIRECTORIES
}

fn default_overall_timeout() -> Duration {
    DEFAULT_OVERALL_TIMEOUT
}

fn default_batch_wait_timeout() -> Duration {
    DEFAULT_BATCH_WAIT_TIMEOUT
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl ScanLimitsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == Some(0) {
            return Err("Batch size must be at least 1".to_string());
        }
        if self.max_files == Some(0) {
            return Err("Max files must be at least 1".to_string());
        }
        if self.max_directories == Some(0) {
            return Err("Max directories must be at least 1".to_string());
        }
        if self.overall_timeout.is_some_and(|t| t.is_zero()) {
            return Err("Overall timeout cannot be zero".to_string());
        }
        if self.batch_wait_timeout.is_some_and(|t| t.is_zero()) {
            return Err("Batch wait timeout cannot be zero".to_string());
        }
        Ok(())
    }
}

impl ScanLimits {
    /// Create a new limits builder.
    pub fn builder() -> ScanLimitsBuilder {
        ScanLimitsBuilder::default()
    }

    /// Check the invariants the builder enforces, for values that came from
    /// deserialization or direct construction.
    pub fn validate(&self) -> Result<(), String> {
        ScanLimitsBuilder::default()
            .max_depth(self.max_depth)
            .max_files(self.max_files)
            .max_directories(self.max_directories)
            .overall_timeout(self.overall_timeout)
            .batch_wait_timeout(self.batch_wait_timeout)
            .batch_size(self.batch_size)
            .build()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_files: DEFAULT_MAX_FILES,
            max_directories: DEFAULT_MAX_DIRECTORIES,
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
            batch_wait_timeout: DEFAULT_BATCH_WAIT_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Configuration for a scanner service: pool size, default limits, ignore file name.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct ScannerConfig {
    /// Limits applied to every scan that does not pass its own.
    #[builder(default)]
    #[serde(default)]
    pub limits: ScanLimits,

    /// Number of worker threads (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// File name of per-directory ignore files.
    #[builder(default = "DEFAULT_IGNORE_FILE_NAME.to_string()")]
    #[serde(default = "default_ignore_file_name")]
    pub ignore_file_name: String,

    /// Files collected between progress broadcasts.
    #[builder(default = "DEFAULT_PROGRESS_INTERVAL")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_ignore_file_name() -> String {
    DEFAULT_IGNORE_FILE_NAME.to_string()
}

fn default_progress_interval() -> usize {
    DEFAULT_PROGRESS_INTERVAL
}

impl ScannerConfig {
    /// Create a new config builder.
    pub fn builder() -> ScannerConfigBuilder {
        ScannerConfigBuilder::default()
    }

    /// Number of pool threads to start.
    ///
    /// Auto-detection leaves one core for the caller but never goes below two.
    pub fn worker_count(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(2),
            n => n,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            limits: ScanLimits::default(),
            threads: 0,
            ignore_file_name: DEFAULT_IGNORE_FILE_NAME.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Serialize durations as integer milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
