//! Error types for sorted-files

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Result type for sorted-files operations.
///
/// Convenience alias using [`SortedFilesError`] as the error type.
pub type Result<T> = std::result::Result<T, SortedFilesError>;

/// Distinguishable kinds of filesystem failure.
///
/// The presentation layer relies on these to show meaningful messages instead
/// of an opaque "something went wrong".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum FsErrorKind {
    NotFound,
    IsADirectory,
    AlreadyExists,
    PermissionDenied,
    Unknown,
}

impl FsErrorKind {
    /// Classify an [`io::Error`].
    pub fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::IsADirectory => Self::IsADirectory,
            io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for FsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsErrorKind::NotFound => write!(f, "file not found"),
            FsErrorKind::IsADirectory => write!(f, "file is a directory"),
            FsErrorKind::AlreadyExists => write!(f, "file already exists"),
            FsErrorKind::PermissionDenied => write!(f, "no permissions"),
            FsErrorKind::Unknown => write!(f, "unknown filesystem error"),
        }
    }
}

/// A failed filesystem operation on a single path.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {}", path.display())]
pub struct FsError {
    pub kind: FsErrorKind,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FsError {
    /// Wrap an io error for `path`, classifying it.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            kind: FsErrorKind::from_io(&source),
            path: path.into(),
            source,
        }
    }

    /// Build an error of an explicit kind. Used by non-OS filesystems.
    pub fn new(kind: FsErrorKind, path: &Path) -> Self {
        let io_kind = match kind {
            FsErrorKind::NotFound => io::ErrorKind::NotFound,
            FsErrorKind::IsADirectory => io::ErrorKind::IsADirectory,
            FsErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            FsErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
            FsErrorKind::Unknown => io::ErrorKind::Other,
        };
        Self {
            kind,
            path: path.to_path_buf(),
            source: io::Error::new(io_kind, kind.to_string()),
        }
    }
}

/// Error type for everything outside a single filesystem call.
#[derive(Debug, thiserror::Error)]
pub enum SortedFilesError {
    /// A filesystem operation failed
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Configuration values are out of range
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The configured filename pattern is not a valid regular expression
    #[error("Invalid pattern: {source}")]
    Pattern {
        #[from]
        source: regex::Error,
    },

    /// The configuration file could not be parsed
    #[error("Failed to parse configuration: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    /// The filesystem watch could not be installed
    #[error("Watch error: {source}")]
    Watch {
        #[from]
        source: notify::Error,
    },

    /// IO errors outside a walk, e.g. reading the configuration file
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SortedFilesError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// The filesystem error kind, if this error came from a filesystem call.
    pub fn fs_kind(&self) -> Option<FsErrorKind> {
        match self {
            SortedFilesError::Fs(e) => Some(e.kind),
            SortedFilesError::Io { source } => Some(FsErrorKind::from_io(source)),
            _ => None,
        }
    }
}
