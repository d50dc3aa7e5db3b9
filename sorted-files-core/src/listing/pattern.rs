//! Filename pattern matching and Unicode normalization.

use crate::error::Result;
use regex::Regex;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::Path;
use unicode_normalization::{IsNormalized, UnicodeNormalization, is_nfc_quick};

/// Normalize a name to composed form (NFC).
///
/// Some filesystems hand back decomposed names; matching, ordering and display
/// all happen on the composed form so visually identical names compare equal.
pub fn normalize_nfc(name: &str) -> Cow<'_, str> {
    match is_nfc_quick(name.chars()) {
        IsNormalized::Yes => Cow::Borrowed(name),
        _ => Cow::Owned(name.nfc().collect()),
    }
}

/// Lossy, NFC-normalized rendering of an OS string.
pub fn normalize_os(name: &OsStr) -> String {
    normalize_nfc(&name.to_string_lossy()).into_owned()
}

/// A compiled filename rule applied to the final path segment.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Test an already-normalized filename.
    pub fn is_match(&self, filename: &str) -> bool {
        self.regex.is_match(filename)
    }

    /// Test a raw filename as returned by the filesystem.
    pub fn matches_name(&self, filename: &OsStr) -> bool {
        self.is_match(&normalize_os(filename))
    }

    /// Test the final segment of `path`. Paths without one never match.
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.matches_name(name))
    }
}
