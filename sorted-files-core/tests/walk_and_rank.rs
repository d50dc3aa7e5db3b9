//! End-to-end walks over real directories

use sorted_files_core::error::FsErrorKind;
use sorted_files_core::fs::{InMemoryFileSystem, LocalFileSystem};
use sorted_files_core::listing::{
    FileEntry, Pattern, SortDirection, SortKey, SortSpec, Walker, rank,
};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn write_file(path: &Path, bytes: usize, modified_secs: u64) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, vec![b'x'; bytes])?;
    let file = File::options().write(true).open(path)?;
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(modified_secs))?;
    Ok(())
}

fn names(entries: &[FileEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name()).collect()
}

#[tokio::test]
async fn test_nested_tree_newest_first() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let root = dir.path();
    write_file(&root.join("a.txt"), 10, 1_000)?;
    write_file(&root.join("b.txt"), 20, 2_000)?;
    write_file(&root.join("sub/c.txt"), 5, 3_000)?;
    write_file(&root.join("sub/ignored.log"), 1, 4_000)?;

    let walker = Walker::new(Arc::new(LocalFileSystem::new()), Pattern::new(r"\.txt$")?);
    let entries = walker.walk(root).await?;
    assert_eq!(entries.len(), 3);

    let ranked = rank(&entries, SortSpec::default(), 100);
    assert_eq!(names(&ranked), vec!["c.txt", "b.txt", "a.txt"]);
    assert_eq!(ranked[0].description(root), "sub");
    assert_eq!(ranked[1].description(root), "");
    assert_eq!(ranked[0].path(), root.join("sub/c.txt"));

    let by_size = rank(&entries, SortSpec::new(SortKey::Size, SortDirection::Ascending), 100);
    assert_eq!(names(&by_size), vec!["c.txt", "a.txt", "b.txt"]);

    let capped = rank(&entries, SortSpec::default(), 2);
    assert_eq!(names(&capped), vec!["c.txt", "b.txt"]);
    Ok(())
}

#[tokio::test]
async fn test_missing_root_is_not_found() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let walker = Walker::new(Arc::new(LocalFileSystem::new()), Pattern::new(".*")?);
    let err = walker
        .walk(&dir.path().join("does-not-exist"))
        .await
        .expect_err("missing root must fail");
    assert_eq!(err.fs_kind(), Some(FsErrorKind::NotFound));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_cycle_terminates() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let root = dir.path();
    write_file(&root.join("inner/real.txt"), 3, 10)?;
    std::os::unix::fs::symlink(root, root.join("inner/loop"))?;
    std::os::unix::fs::symlink(root.join("inner/real.txt"), root.join("alias.txt"))?;

    let walker = Walker::new(Arc::new(LocalFileSystem::new()), Pattern::new(r"\.txt$")?);
    let entries = walker.walk(root).await?;
    assert_eq!(names(&entries), vec!["real.txt"]);
    Ok(())
}

#[tokio::test]
async fn test_decomposed_names_match_composed_pattern() -> anyhow::Result<()> {
    let fs = InMemoryFileSystem::new();
    let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1);
    // "café.txt" spelled with a combining acute accent
    fs.add_file("/r/cafe\u{0301}.txt", 4, at, at);
    fs.add_file("/r/tea.txt", 4, at, at);

    let walker = Walker::new(Arc::new(fs), Pattern::new("^caf\u{00e9}")?);
    let entries = walker.walk(Path::new("/r")).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name(), "caf\u{00e9}.txt");
    assert_eq!(entries[0].path(), Path::new("/r/cafe\u{0301}.txt"));
    Ok(())
}

#[tokio::test]
async fn test_rank_properties_hold_for_generated_trees() -> anyhow::Result<()> {
    let fs = InMemoryFileSystem::new();
    let at = |secs: u64| SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
    let mut expected_matching = 0;
    for i in 0..40u64 {
        let dir = format!("/r/d{}/e{}", i % 5, i % 3);
        let ext = if i % 4 == 0 { "md" } else { "txt" };
        if ext == "txt" {
            expected_matching += 1;
        }
        // spread values so no two keys tie
        fs.add_file(
            format!("{dir}/f{i:02}.{ext}"),
            (i * 7919) % 1000 + i,
            at(1_000 + (i * 37) % 41),
            at(2_000 + (i * 13) % 43),
        );
    }

    let walker = Walker::new(Arc::new(fs), Pattern::new(r"\.txt$")?);
    let entries = walker.walk(Path::new("/r")).await?;
    assert_eq!(entries.len(), expected_matching);
    assert!(entries.iter().all(|e| e.name().ends_with(".txt")));

    for key in SortKey::ALL {
        for cap in [1, 7, expected_matching, 100] {
            let up = rank(&entries, SortSpec::new(key, SortDirection::Ascending), cap);
            let down = rank(&entries, SortSpec::new(key, SortDirection::Descending), cap);
            assert_eq!(up.len(), cap.min(expected_matching));
            assert_eq!(down.len(), cap.min(expected_matching));

            let value = |e: &FileEntry| {
                let stat = e.stat().copied().expect("ranked entries have metadata");
                match key {
                    SortKey::ModifiedTime => stat.modified.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs(),
                    SortKey::CreationTime => stat.created.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs(),
                    SortKey::Size => stat.size,
                    SortKey::Name => 0,
                }
            };
            if key == SortKey::Name {
                assert!(up.windows(2).all(|w| w[0].normalized_path() <= w[1].normalized_path()));
                assert!(down.windows(2).all(|w| w[0].normalized_path() >= w[1].normalized_path()));
            } else {
                assert!(up.windows(2).all(|w| value(&w[0]) <= value(&w[1])), "{key} ascending");
                assert!(down.windows(2).all(|w| value(&w[0]) >= value(&w[1])), "{key} descending");
            }
        }
    }
    Ok(())
}
