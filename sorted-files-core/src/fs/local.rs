use super::FileSystem;
use crate::error::{FsError, FsErrorKind};
use crate::listing::entry::{FileKind, FileStat};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

/// The local disk, accessed through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn list_children(&self, path: &Path) -> Result<Vec<(OsString, FileKind)>, FsError> {
        let mut dir = tokio::fs::read_dir(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;

        let mut children = Vec::new();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("Stopped listing {}: {}", path.display(), e);
                    break;
                }
            };
            // DirEntry::file_type does not follow symlinks
            let kind = match entry.file_type().await {
                Ok(ft) => FileKind::from_file_type(ft),
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            children.push((entry.file_name(), kind));
        }
        Ok(children)
    }

    async fn stat_path(&self, path: &Path) -> Result<FileStat, FsError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        if metadata.is_dir() {
            return Err(FsError::new(FsErrorKind::IsADirectory, path));
        }
        // No usable modification time means no entry rather than a guessed one
        FileStat::from_metadata(&metadata).map_err(|e| FsError::from_io(path, e))
    }
}
