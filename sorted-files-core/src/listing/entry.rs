//! Discovered files and their metadata.

use super::pattern::normalize_nfc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Classification of a directory child. Symlinks are never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    RegularFile,
    Directory,
    SymbolicLink,
    Unknown,
}

impl FileKind {
    /// Classify a file type without following symlinks.
    pub fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            FileKind::SymbolicLink
        } else if file_type.is_file() {
            FileKind::RegularFile
        } else if file_type.is_dir() {
            FileKind::Directory
        } else {
            FileKind::Unknown
        }
    }
}

/// Size and timestamps of a regular file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub created: SystemTime,
    pub modified: SystemTime,
}

impl FileStat {
    pub fn new(size: u64, created: SystemTime, modified: SystemTime) -> Self {
        Self {
            size,
            created,
            modified,
        }
    }

    /// Build from std metadata.
    ///
    /// Platforms without a birth time report the inode change time on unix,
    /// otherwise the modification time. Fails when the modification time
    /// itself is unavailable.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> std::io::Result<Self> {
        let modified = metadata.modified()?;
        let created = metadata
            .created()
            .ok()
            .or_else(|| change_time(metadata))
            .unwrap_or(modified);
        Ok(Self::new(metadata.len(), created, modified))
    }
}

#[cfg(unix)]
fn change_time(metadata: &std::fs::Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(_metadata: &std::fs::Metadata) -> Option<SystemTime> {
    None
}

/// One discovered file.
///
/// `path` is the location as found on disk and is what callers open.
/// `normalized` is the NFC rendering used for identity, name ordering and
/// display.
#[derive(Debug, Clone)]
pub struct FileEntry {
    path: PathBuf,
    normalized: String,
    kind: FileKind,
    stat: Option<FileStat>,
}

impl FileEntry {
    pub fn new(path: PathBuf, kind: FileKind, stat: Option<FileStat>) -> Self {
        let normalized = normalize_nfc(&path.to_string_lossy()).into_owned();
        Self {
            path,
            normalized,
            kind,
            stat,
        }
    }

    /// A regular file with known metadata.
    pub fn file(path: PathBuf, stat: FileStat) -> Self {
        Self::new(path, FileKind::RegularFile, Some(stat))
    }

    // Accessors

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn normalized_path(&self) -> &str {
        &self.normalized
    }

    #[inline]
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    #[inline]
    pub fn stat(&self) -> Option<&FileStat> {
        self.stat.as_ref()
    }

    /// Normalized filename, or the whole path if there is none.
    pub fn name(&self) -> &str {
        self.normalized
            .rsplit(std::path::MAIN_SEPARATOR)
            .next()
            .unwrap_or(&self.normalized)
    }

    /// Parent directory relative to `root`, empty for direct children.
    ///
    /// Entries outside `root` get no description.
    pub fn description(&self, root: &Path) -> String {
        self.path
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(|rel| normalize_nfc(&rel.to_string_lossy()).into_owned())
            .unwrap_or_default()
    }
}

impl PartialEq for FileEntry {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for FileEntry {}

impl std::hash::Hash for FileEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}
