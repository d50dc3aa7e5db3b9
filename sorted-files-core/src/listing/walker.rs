//! Recursive discovery of matching regular files.
//!
//! The walk fans out one tokio task per subdirectory and joins them before
//! returning, so the result is a flat list built without shared mutable
//! state. Each task collects its own subtree; merging only happens at join
//! points.
//!
//! ```text
//! root ─┬─ list ── stat matching files
//!       ├─ task(sub1) ─┬─ list ── stat
//!       │              └─ task(sub1/deeper) ...
//!       └─ task(sub2) ...
//!                         ↓ join all
//!                    Vec<FileEntry>
//! ```
//!
//! Symbolic links are neither followed nor reported, so link cycles cannot
//! cause unbounded recursion. Failures below the root drop the affected path
//! and nothing else; a failure to list the root itself fails the walk.

use super::entry::{FileEntry, FileKind};
use super::pattern::Pattern;
use crate::error::{FsError, Result};
use crate::fs::FileSystem;
use futures::future::{BoxFuture, FutureExt, join_all};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

struct WalkContext {
    fs: Arc<dyn FileSystem>,
    pattern: Pattern,
}

/// Walks a directory tree and collects matching regular files
#[derive(Clone)]
pub struct Walker {
    ctx: Arc<WalkContext>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("pattern", &self.ctx.pattern.as_str())
            .finish_non_exhaustive()
    }
}

impl Walker {
    pub fn new(fs: Arc<dyn FileSystem>, pattern: Pattern) -> Self {
        Self {
            ctx: Arc::new(WalkContext { fs, pattern }),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.ctx.pattern
    }

    /// Collect every regular file beneath `root` whose name matches the pattern.
    ///
    /// # Errors
    /// Only when `root` itself cannot be listed. Inaccessible files and
    /// subdirectories are omitted from the result instead.
    pub async fn walk(&self, root: &Path) -> Result<Vec<FileEntry>> {
        let entries = walk_dir(Arc::clone(&self.ctx), root.to_path_buf()).await?;
        debug!("Walk of {} found {} entries", root.display(), entries.len());
        Ok(entries)
    }
}

/// Subtree walk spawned as its own task; swallows its own failure.
fn walk_subtree(ctx: Arc<WalkContext>, dir: PathBuf) -> BoxFuture<'static, Vec<FileEntry>> {
    async move {
        match walk_dir(ctx, dir.clone()).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping directory {}: {}", dir.display(), e);
                Vec::new()
            }
        }
    }
    .boxed()
}

async fn walk_dir(ctx: Arc<WalkContext>, dir: PathBuf) -> std::result::Result<Vec<FileEntry>, FsError> {
    let children = ctx.fs.list_children(&dir).await?;

    let mut subtrees = JoinSet::new();
    let mut files = Vec::new();
    for (name, kind) in children {
        match kind {
            FileKind::Directory => {
                subtrees.spawn(walk_subtree(Arc::clone(&ctx), dir.join(&name)));
            }
            FileKind::RegularFile if ctx.pattern.matches_name(&name) => {
                files.push(dir.join(&name));
            }
            FileKind::RegularFile => {}
            FileKind::SymbolicLink | FileKind::Unknown => {
                tracing::trace!("Ignoring {:?} entry {}", kind, dir.join(&name).display());
            }
        }
    }

    let stats = join_all(files.into_iter().map(|path| {
        let ctx = Arc::clone(&ctx);
        async move {
            match ctx.fs.stat_path(&path).await {
                Ok(stat) => Some(FileEntry::file(path, stat)),
                Err(e) => {
                    debug!("Skipping file {}: {}", path.display(), e);
                    None
                }
            }
        }
    }))
    .await;
    let mut entries: Vec<FileEntry> = stats.into_iter().flatten().collect();

    while let Some(joined) = subtrees.join_next().await {
        match joined {
            Ok(sub_entries) => entries.extend(sub_entries),
            Err(e) => warn!("Subtree task under {} failed: {}", dir.display(), e),
        }
    }
    Ok(entries)
}
