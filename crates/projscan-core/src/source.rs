//! Readable directory tree abstraction.

use std::path::{Path, PathBuf};

use crate::entry::{Freshness, SourceEntry};
use crate::error::ScanError;

/// A read-only tree of named entries that can be scanned.
///
/// Paths handed to and returned by a source are full paths under
/// [`root`](ScanSource::root). Sources are shared across worker threads.
pub trait ScanSource: Send + Sync {
    /// The scan root.
    fn root(&self) -> &Path;

    /// Stable identity of the root, used as the cache key.
    fn root_key(&self) -> String {
        self.root().to_string_lossy().into_owned()
    }

    /// Current freshness stamp of the root.
    fn freshness(&self) -> Result<Freshness, ScanError>;

    /// List the direct children of a directory.
    fn read_dir(&self, dir: &Path) -> Result<Vec<SourceEntry>, ScanError>;

    /// Read a text file.
    fn read_to_string(&self, file: &Path) -> Result<String, ScanError>;

    /// Find every file named `file_name` anywhere under the root.
    ///
    /// The default visits the whole tree through [`read_dir`](ScanSource::read_dir),
    /// skipping directories that cannot be listed.
    fn ignore_files(&self, file_name: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut pending = vec![self.root().to_path_buf()];

        while let Some(dir) = pending.pop() {
            let Ok(children) = self.read_dir(&dir) else {
                continue;
            };
            for child in children {
                if child.is_dir {
                    pending.push(child.path);
                } else if child.name.as_str() == file_name {
                    found.push(child.path);
                }
            }
        }

        found
    }
}
