use super::FileSystem;
use crate::error::{FsError, FsErrorKind};
use crate::listing::entry::{FileKind, FileStat};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
enum Node {
    File(FileStat),
    Dir,
    Symlink(PathBuf),
}

#[derive(Debug, Default)]
struct Tree {
    nodes: BTreeMap<PathBuf, Node>,
    failures: HashMap<PathBuf, FsErrorKind>,
    gates: HashMap<PathBuf, Arc<Notify>>,
}

/// An in-memory filesystem with explicit timestamps.
///
/// Cloning shares the underlying tree, so a test can keep a handle and
/// mutate files while a session walks them. Paths are stored as given; use
/// absolute paths. Parent directories are created implicitly.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileSystem {
    tree: Arc<Mutex<Tree>>,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tree> {
        // A poisoned lock only means a test panicked mid-mutation
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, path: &Path, node: Node) {
        let mut tree = self.lock();
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            tree.nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Dir);
        }
        tree.nodes.insert(path.to_path_buf(), node);
    }

    /// Create (or replace) a regular file.
    pub fn add_file(&self, path: impl AsRef<Path>, size: u64, created: SystemTime, modified: SystemTime) {
        self.insert(path.as_ref(), Node::File(FileStat::new(size, created, modified)));
    }

    /// Create a directory.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), Node::Dir);
    }

    /// Create a symbolic link. The target is recorded but never followed.
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        self.insert(path.as_ref(), Node::Symlink(target.into()));
    }

    /// Remove a path and everything beneath it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.lock().nodes.retain(|p, _| !p.starts_with(path));
    }

    /// Make every list or stat call on `path` fail with `kind`.
    pub fn fail_path(&self, path: impl AsRef<Path>, kind: FsErrorKind) {
        self.lock().failures.insert(path.as_ref().to_path_buf(), kind);
    }

    pub fn clear_failure(&self, path: impl AsRef<Path>) {
        self.lock().failures.remove(path.as_ref());
    }

    /// Hold every listing of `path` until the returned gate is notified.
    ///
    /// Lets tests keep a walk in flight while other things happen.
    pub fn gate(&self, path: impl AsRef<Path>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock()
            .gates
            .insert(path.as_ref().to_path_buf(), Arc::clone(&gate));
        gate
    }

    fn check_failure(&self, path: &Path) -> Result<(), FsError> {
        match self.lock().failures.get(path) {
            Some(kind) => Err(FsError::new(*kind, path)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn list_children(&self, path: &Path) -> Result<Vec<(OsString, FileKind)>, FsError> {
        let gate = self.lock().gates.remove(path);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_failure(path)?;

        let tree = self.lock();
        match tree.nodes.get(path) {
            Some(Node::Dir) => {}
            Some(_) => return Err(FsError::new(FsErrorKind::Unknown, path)),
            None => return Err(FsError::new(FsErrorKind::NotFound, path)),
        }
        let children = tree
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .filter_map(|(p, node)| {
                let kind = match node {
                    Node::File(_) => FileKind::RegularFile,
                    Node::Dir => FileKind::Directory,
                    Node::Symlink(_) => FileKind::SymbolicLink,
                };
                p.file_name().map(|name| (name.to_os_string(), kind))
            })
            .collect();
        Ok(children)
    }

    async fn stat_path(&self, path: &Path) -> Result<FileStat, FsError> {
        self.check_failure(path)?;
        match self.lock().nodes.get(path) {
            Some(Node::File(stat)) => Ok(*stat),
            Some(Node::Dir) => Err(FsError::new(FsErrorKind::IsADirectory, path)),
            Some(Node::Symlink(target)) => {
                tracing::trace!("Not following {} -> {}", path.display(), target.display());
                Err(FsError::new(FsErrorKind::Unknown, path))
            }
            None => Err(FsError::new(FsErrorKind::NotFound, path)),
        }
    }
}
