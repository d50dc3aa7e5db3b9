use chrono::{DateTime, Local};
use serde::Serialize;
use sorted_files_core::listing::{FileEntry, SessionStatus, SortSpec};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct EntryOutput {
    path: String,
    description: String,
    size: u64,
    created: DateTime<Local>,
    modified: DateTime<Local>,
}

impl EntryOutput {
    fn from_entry(entry: &FileEntry, root: Option<&Path>) -> Option<Self> {
        let stat = entry.stat()?;
        Some(Self {
            path: entry.normalized_path().to_string(),
            description: root.map(|r| entry.description(r)).unwrap_or_default(),
            size: stat.size,
            created: stat.created.into(),
            modified: stat.modified.into(),
        })
    }
}

#[derive(Serialize)]
struct ListOutput<'a> {
    title: String,
    root: Option<&'a Path>,
    sort: SortSpec,
    entries: Vec<EntryOutput>,
}

/// Print one ranked list.
pub fn write_list<W: Write>(
    out: &mut W,
    root: Option<&Path>,
    sort: SortSpec,
    entries: &[FileEntry],
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let rows: Vec<EntryOutput> = entries
        .iter()
        .filter_map(|e| EntryOutput::from_entry(e, root))
        .collect();

    match format {
        OutputFormat::Json => {
            let list = ListOutput {
                title: sort.title(),
                root,
                sort,
                entries: rows,
            };
            serde_json::to_writer_pretty(&mut *out, &list)?;
            writeln!(out)?;
        }
        OutputFormat::Summary => {
            writeln!(out, "{}", sort.title())?;
            if rows.is_empty() {
                writeln!(out, "No matching files")?;
            }
            for row in rows {
                let description = if row.description.is_empty() {
                    String::new()
                } else {
                    format!("  ({})", row.description)
                };
                writeln!(
                    out,
                    "{}{}  {}  {}",
                    row.path,
                    description,
                    format_size(row.size),
                    row.modified.format("%Y-%m-%d %H:%M:%S")
                )?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

pub fn write_status<W: Write>(
    out: &mut W,
    status: &SessionStatus,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, status)?;
            writeln!(out)?;
        }
        OutputFormat::Summary => {
            let root = status
                .root
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string());
            writeln!(out, "Root: {root}")?;
            writeln!(out, "State: {:?}", status.state)?;
            writeln!(out, "Sort: {} {:?}", status.sort.key, status.sort.direction)?;
            writeln!(out, "Pattern: {}", status.pattern)?;
            writeln!(
                out,
                "Files: {} shown of {} matching (cap {})",
                status.displayed_entries, status.walked_entries, status.max_items
            )?;
            if status.refresh_pending {
                writeln!(out, "Refresh pending")?;
            }
            if let Some(error) = &status.last_error {
                writeln!(out, "Last error: {error}")?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorted_files_core::listing::{FileStat, SortDirection, SortKey};
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn entries() -> Vec<FileEntry> {
        let at = |secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
        vec![
            FileEntry::file(PathBuf::from("/r/sub/c.txt"), FileStat::new(2048, at(3), at(3))),
            FileEntry::file(PathBuf::from("/r/a.txt"), FileStat::new(10, at(1), at(1))),
        ]
    }

    #[test]
    fn test_summary_lists_title_and_rows() -> anyhow::Result<()> {
        let mut out = Vec::new();
        write_list(
            &mut out,
            Some(Path::new("/r")),
            SortSpec::default(),
            &entries(),
            &OutputFormat::Summary,
        )?;
        let text = String::from_utf8(out)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Sorted Files (By Modified Time)");
        assert!(lines[1].starts_with("/r/sub/c.txt  (sub)  2.0 KB  "));
        assert!(lines[2].starts_with("/r/a.txt  10 B  "));
        assert_eq!(lines.len(), 3);
        Ok(())
    }

    #[test]
    fn test_summary_empty_list() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let spec = SortSpec::new(SortKey::Size, SortDirection::Ascending);
        write_list(&mut out, None, spec, &[], &OutputFormat::Summary)?;
        assert_eq!(
            String::from_utf8(out)?,
            "Sorted Files (By File Size)\nNo matching files\n"
        );
        Ok(())
    }

    #[test]
    fn test_json_output() -> anyhow::Result<()> {
        let mut out = Vec::new();
        write_list(
            &mut out,
            Some(Path::new("/r")),
            SortSpec::default(),
            &entries(),
            &OutputFormat::Json,
        )?;
        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!(value["title"], "Sorted Files (By Modified Time)");
        assert_eq!(value["sort"]["key"], "ModifiedTime");
        assert_eq!(value["entries"][0]["path"], "/r/sub/c.txt");
        assert_eq!(value["entries"][0]["description"], "sub");
        assert_eq!(value["entries"][1]["size"], 10);
        Ok(())
    }

    #[test]
    fn test_format_parsing_and_sizes() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("full".parse::<OutputFormat>().is_err());
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
