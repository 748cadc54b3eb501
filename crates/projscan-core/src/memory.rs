//! In-memory [`ScanSource`] implementation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

use crate::entry::{Freshness, SourceEntry};
use crate::error::ScanError;
use crate::source::ScanSource;

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { contents: String, modified: SystemTime },
}

/// A virtual directory tree held in memory.
///
/// Useful for scanning trees that do not live on disk and for exercising the
/// scanner deterministically: the freshness stamp only changes through
/// [`touch`](MemoryTree::touch), and every listing can be slowed down with
/// [`set_read_delay`](MemoryTree::set_read_delay).
#[derive(Debug)]
pub struct MemoryTree {
    root: PathBuf,
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    stamp: AtomicU64,
    read_delay_micros: AtomicU64,
    read_dir_calls: AtomicUsize,
}

impl MemoryTree {
    /// Create an empty tree rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut nodes = BTreeMap::new();
        nodes.insert(root.clone(), Node::Dir);
        Self {
            root,
            nodes: RwLock::new(nodes),
            stamp: AtomicU64::new(1),
            read_delay_micros: AtomicU64::new(0),
            read_dir_calls: AtomicUsize::new(0),
        }
    }

    /// Add a file, creating missing parent directories.
    #[must_use]
    pub fn with_file(self, relative: &str, contents: &str) -> Self {
        self.add_file(relative, contents);
        self
    }

    /// Add an empty directory, creating missing parents.
    #[must_use]
    pub fn with_dir(self, relative: &str) -> Self {
        self.add_dir(relative);
        self
    }

    /// Add a file, creating missing parent directories.
    pub fn add_file(&self, relative: &str, contents: &str) {
        let path = self.resolve(relative);
        let mut nodes = self.nodes.write();
        insert_parents(&mut nodes, &self.root, &path);
        nodes.insert(
            path,
            Node::File {
                contents: contents.to_string(),
                modified: SystemTime::now(),
            },
        );
    }

    /// Add an empty directory, creating missing parents.
    pub fn add_dir(&self, relative: &str) {
        let path = self.resolve(relative);
        let mut nodes = self.nodes.write();
        insert_parents(&mut nodes, &self.root, &path);
        nodes.insert(path, Node::Dir);
    }

    /// Remove an entry and everything beneath it.
    pub fn remove(&self, relative: &str) {
        let path = self.resolve(relative);
        self.nodes.write().retain(|p, _| !p.starts_with(&path));
    }

    /// Advance the root's freshness stamp.
    pub fn touch(&self) {
        self.stamp.fetch_add(1, Ordering::SeqCst);
    }

    /// Delay every directory listing by `delay`.
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_micros
            .store(delay.as_micros().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    /// Number of directory listings served so far.
    pub fn read_dir_calls(&self) -> usize {
        self.read_dir_calls.load(Ordering::SeqCst)
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in relative.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }
}

fn insert_parents(nodes: &mut BTreeMap<PathBuf, Node>, root: &Path, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if !dir.starts_with(root) {
            break;
        }
        nodes.entry(dir.to_path_buf()).or_insert(Node::Dir);
        if dir == root {
            break;
        }
        current = dir.parent();
    }
}

impl ScanSource for MemoryTree {
    fn root(&self) -> &Path {
        &self.root
    }

    fn freshness(&self) -> Result<Freshness, ScanError> {
        Ok(Freshness::new(u128::from(self.stamp.load(Ordering::SeqCst))))
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<SourceEntry>, ScanError> {
        self.read_dir_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.read_delay_micros.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_micros(delay));
        }

        let nodes = self.nodes.read();
        match nodes.get(dir) {
            Some(Node::Dir) => {}
            Some(Node::File { .. }) => {
                return Err(ScanError::NotADirectory {
                    path: dir.to_path_buf(),
                });
            }
            None => {
                return Err(ScanError::NotFound {
                    path: dir.to_path_buf(),
                });
            }
        }

        let children = nodes
            .range(dir.to_path_buf()..)
            .skip(1)
            .take_while(|(path, _)| path.starts_with(dir))
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, node)| match node {
                Node::Dir => SourceEntry::directory(path.clone(), SystemTime::UNIX_EPOCH),
                Node::File { contents, modified } => {
                    SourceEntry::file(path.clone(), contents.len() as u64, *modified)
                }
            })
            .collect();

        Ok(children)
    }

    fn read_to_string(&self, file: &Path) -> Result<String, ScanError> {
        match self.nodes.read().get(file) {
            Some(Node::File { contents, .. }) => Ok(contents.clone()),
            Some(Node::Dir) => Err(ScanError::Other {
                message: format!("{} is a directory", file.display()),
            }),
            None => Err(ScanError::NotFound {
                path: file.to_path_buf(),
            }),
        }
    }
}
