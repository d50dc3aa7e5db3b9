//! Sorting and capping of walk results.
//!
//! [`rank`] is a pure function: the same entries, spec and cap always give
//! the same output (up to the order of ties, which is not a contract).

use super::entry::{FileEntry, FileStat};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Attribute the list is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    ModifiedTime,
    CreationTime,
    Name,
    Size,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::ModifiedTime,
        SortKey::CreationTime,
        SortKey::Name,
        SortKey::Size,
    ];

    /// Human readable label used in titles
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::ModifiedTime => "Modified Time",
            SortKey::CreationTime => "Creation Time",
            SortKey::Name => "File Name",
            SortKey::Size => "File Size",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::ModifiedTime => write!(f, "modified"),
            SortKey::CreationTime => write!(f, "created"),
            SortKey::Name => write!(f, "name"),
            SortKey::Size => write!(f, "size"),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "modified" | "mtime" | "modified-time" | "modified_time" => Ok(SortKey::ModifiedTime),
            "created" | "ctime" | "creation-time" | "creation_time" => Ok(SortKey::CreationTime),
            "name" | "filename" | "file-name" | "file_name" => Ok(SortKey::Name),
            "size" | "filesize" | "file-size" | "file_size" => Ok(SortKey::Size),
            _ => Err(format!(
                "Invalid sort key: '{s}'. Valid values are: modified, created, name, size"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Current ordering: a key plus a direction.
///
/// Selecting the active key again toggles the direction; selecting another
/// key switches to it in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    /// Newest first
    fn default() -> Self {
        Self::new(SortKey::ModifiedTime, SortDirection::Descending)
    }
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Apply a key selection.
    pub fn select(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.reversed();
        } else {
            self.key = key;
            self.direction = SortDirection::Ascending;
        }
    }

    pub fn title(&self) -> String {
        format!("Sorted Files (By {})", self.key.label())
    }

    /// Compare two stats under this spec. Name ordering needs the entries.
    fn compare(&self, a: &FileEntry, a_stat: &FileStat, b: &FileEntry, b_stat: &FileStat) -> Ordering {
        let ordering = match self.key {
            SortKey::ModifiedTime => a_stat.modified.cmp(&b_stat.modified),
            SortKey::CreationTime => a_stat.created.cmp(&b_stat.created),
            SortKey::Size => a_stat.size.cmp(&b_stat.size),
            SortKey::Name => locale_cmp(a.normalized_path(), b.normalized_path()),
        };
        self.direction.apply(ordering)
    }
}

/// Sort `entries` under `spec` and keep the first `cap`.
///
/// Entries without metadata are dropped rather than placed arbitrarily.
pub fn rank(entries: &[FileEntry], spec: SortSpec, cap: usize) -> Vec<FileEntry> {
    let mut ranked: Vec<(&FileEntry, &FileStat)> = entries
        .iter()
        .filter_map(|entry| entry.stat().map(|stat| (entry, stat)))
        .collect();

    ranked.sort_unstable_by(|(a, a_stat), (b, b_stat)| spec.compare(a, a_stat, b, b_stat));
    ranked.truncate(cap);
    ranked.into_iter().map(|(entry, _)| entry.clone()).collect()
}

/// Locale-style string comparison.
///
/// Strings are compared first ignoring case and accents, then by accents,
/// then by case, and finally by code point so the order is total.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    fn base(s: &str) -> String {
        s.nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect()
    }
    fn accented(s: &str) -> String {
        s.nfd().flat_map(char::to_lowercase).collect()
    }

    base(a)
        .cmp(&base(b))
        .then_with(|| accented(a).cmp(&accented(b)))
        .then_with(|| {
            // lowercase before uppercase at the case level
            let case_a: Vec<bool> = a.chars().map(char::is_uppercase).collect();
            let case_b: Vec<bool> = b.chars().map(char::is_uppercase).collect();
            case_a.cmp(&case_b)
        })
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn entry(path: &str, size: u64, created: u64, modified: u64) -> FileEntry {
        FileEntry::file(PathBuf::from(path), FileStat::new(size, at(created), at(modified)))
    }

    fn paths(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name()).collect()
    }

    fn sample() -> Vec<FileEntry> {
        vec![
            entry("/r/a.txt", 10, 30, 1),
            entry("/r/b.txt", 20, 20, 2),
            entry("/r/sub/c.txt", 5, 10, 3),
        ]
    }

    #[test]
    fn test_select_toggles_and_resets() {
        let mut spec = SortSpec::default();
        assert_eq!(spec, SortSpec::new(SortKey::ModifiedTime, SortDirection::Descending));

        spec.select(SortKey::ModifiedTime);
        assert_eq!(spec.direction, SortDirection::Ascending);
        spec.select(SortKey::ModifiedTime);
        assert_eq!(spec.direction, SortDirection::Descending);

        spec.select(SortKey::Size);
        assert_eq!(spec, SortSpec::new(SortKey::Size, SortDirection::Ascending));
        spec.select(SortKey::Size);
        spec.select(SortKey::Name);
        assert_eq!(spec, SortSpec::new(SortKey::Name, SortDirection::Ascending));
    }

    #[test]
    fn test_each_key_orders_both_directions() {
        let entries = sample();
        let cases = [
            (SortKey::ModifiedTime, vec!["a.txt", "b.txt", "c.txt"]),
            (SortKey::CreationTime, vec!["c.txt", "b.txt", "a.txt"]),
            (SortKey::Size, vec!["c.txt", "a.txt", "b.txt"]),
            (SortKey::Name, vec!["a.txt", "b.txt", "c.txt"]),
        ];
        for (key, ascending) in cases {
            let up = rank(&entries, SortSpec::new(key, SortDirection::Ascending), 10);
            assert_eq!(paths(&up), ascending, "{key} ascending");

            let down = rank(&entries, SortSpec::new(key, SortDirection::Descending), 10);
            let mut descending = ascending.clone();
            descending.reverse();
            assert_eq!(paths(&down), descending, "{key} descending");
        }
    }

    #[test]
    fn test_cap_keeps_top_ranked() {
        let entries = sample();
        let top = rank(&entries, SortSpec::default(), 2);
        assert_eq!(paths(&top), vec!["c.txt", "b.txt"]);
    }

    #[test]
    fn test_entries_without_metadata_are_dropped() {
        let mut entries = sample();
        entries.push(FileEntry::new(
            PathBuf::from("/r/nostat.txt"),
            crate::listing::entry::FileKind::RegularFile,
            None,
        ));
        let ranked = rank(&entries, SortSpec::default(), 10);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|e| e.stat().is_some()));

        // three ranked candidates remain, so a cap of two binds
        let capped = rank(&entries, SortSpec::default(), 2);
        assert_eq!(paths(&capped), vec!["c.txt", "b.txt"]);
        let wide = rank(&entries, SortSpec::new(SortKey::Size, SortDirection::Descending), 4);
        assert_eq!(paths(&wide), vec!["b.txt", "a.txt", "c.txt"]);
    }

    #[test]
    fn test_locale_cmp_ignores_case_and_accents_first() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("\u{00e9}clair", "ezra"), Ordering::Less);
        assert_eq!(locale_cmp("eclair", "\u{00e9}clair"), Ordering::Less);
        assert_eq!(locale_cmp("a", "A"), Ordering::Less);
        assert_eq!(locale_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("mtime".parse::<SortKey>().unwrap(), SortKey::ModifiedTime);
        assert_eq!("Created".parse::<SortKey>().unwrap(), SortKey::CreationTime);
        assert_eq!("FILENAME".parse::<SortKey>().unwrap(), SortKey::Name);
        assert_eq!("size".parse::<SortKey>().unwrap(), SortKey::Size);
        assert!("colour".parse::<SortKey>().is_err());

        for key in SortKey::ALL {
            assert_eq!(key.to_string().parse::<SortKey>().unwrap(), key);
        }
        assert_eq!(SortSpec::default().title(), "Sorted Files (By Modified Time)");
    }
}
