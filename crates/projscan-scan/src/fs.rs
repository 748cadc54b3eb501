//! Local file system source.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use jwalk::{Parallelism, WalkDir};

use projscan_core::{Freshness, ScanError, ScanSource, SourceEntry};

/// Threads used to discover ignore files.
const DISCOVERY_THREADS: usize = 2;

/// A directory on the local file system.
///
/// Symbolic links are never followed into: a link to a file is listed as a
/// file, links to directories and broken links are left out.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Open a root directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ScanError> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| ScanError::io(root, e))?;

        if !root.is_dir() {
            return Err(ScanError::NotADirectory { path: root });
        }

        Ok(Self { root })
    }

    fn entry_for(path: PathBuf, file_type: fs::FileType) -> Result<Option<SourceEntry>, ScanError> {
        if file_type.is_symlink() {
            // Resolve the link only to learn whether it points at a file.
            return match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => Ok(Some(SourceEntry::file(
                    path,
                    meta.len(),
                    meta.modified().unwrap_or(UNIX_EPOCH),
                ))),
                _ => Ok(None),
            };
        }

        let meta = fs::symlink_metadata(&path).map_err(|e| ScanError::io(&path, e))?;
        let modified = meta.modified().unwrap_or(UNIX_EPOCH);

        if file_type.is_dir() {
            Ok(Some(SourceEntry::directory(path, modified)))
        } else if file_type.is_file() {
            Ok(Some(SourceEntry::file(path, meta.len(), modified)))
        } else {
            Ok(None)
        }
    }
}

impl ScanSource for LocalFs {
    fn root(&self) -> &Path {
        &self.root
    }

    fn freshness(&self) -> Result<Freshness, ScanError> {
        let meta = fs::metadata(&self.root).map_err(|e| ScanError::io(&self.root, e))?;
        let modified = meta.modified().map_err(|e| ScanError::io(&self.root, e))?;
        Ok(Freshness::from(modified))
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<SourceEntry>, ScanError> {
        let mut children = Vec::new();

        for entry in fs::read_dir(dir).map_err(|e| ScanError::io(dir, e))? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(dir = %dir.display(), "Skipping unreadable entry: {err}");
                    continue;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    tracing::debug!(path = %path.display(), "Skipping entry without type: {err}");
                    continue;
                }
            };

            match Self::entry_for(path, file_type) {
                Ok(Some(child)) => children.push(child),
                Ok(None) => {}
                Err(err) => tracing::debug!("Skipping entry: {err}"),
            }
        }

        Ok(children)
    }

    fn read_to_string(&self, file: &Path) -> Result<String, ScanError> {
        fs::read_to_string(file).map_err(|e| ScanError::io(file, e))
    }

    fn ignore_files(&self, file_name: &str) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .parallelism(Parallelism::RayonNewPool(DISCOVERY_THREADS))
            .skip_hidden(false)
            .follow_links(false)
            .process_read_dir(|_depth, _path, _state, children| {
                children.retain(|entry| {
                    entry
                        .as_ref()
                        .map(|e| !(e.file_type().is_dir() && e.file_name() == ".git"))
                        .unwrap_or(false)
                });
            })
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
            .map(|entry| entry.path())
            .collect()
    }
}
