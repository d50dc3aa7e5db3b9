//! Filesystem abstraction consumed by the walker.
//!
//! The walker never touches `std::fs` directly. It goes through [`FileSystem`],
//! which keeps the traversal logic testable against an in-memory tree and
//! lets embedders plug in other backends.
//!
//! ## Implementations
//!
//! - **[`LocalFileSystem`]**: the real disk, via `tokio::fs`
//! - **[`InMemoryFileSystem`]**: a mutable tree with explicit timestamps and
//!   injectable failures

use crate::error::FsError;
use crate::listing::entry::{FileKind, FileStat};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

pub mod local;
pub mod memory;

pub use local::LocalFileSystem;
pub use memory::InMemoryFileSystem;

/// Directory listing and stat operations. See module docs for details.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// List the immediate children of `path` with their classification
    async fn list_children(&self, path: &Path) -> Result<Vec<(OsString, FileKind)>, FsError>;

    /// Size and timestamps of `path`
    async fn stat_path(&self, path: &Path) -> Result<FileStat, FsError>;
}
