//! sorted-files-core: a live, sorted, capped listing of one directory tree
//!
//! This crate recursively scans a watched directory, keeps the regular files
//! whose names match a configured pattern, and ranks them by modification
//! time, creation time, name or size. A filesystem watch keeps the list
//! current: every relevant change triggers a full re-walk whose result
//! atomically replaces the displayed list.
//!
//! ## Key Modules
//!
//! - **[`listing`]**: walker, ranker, directory watcher and the refresh session
//! - **[`fs`]**: filesystem abstraction with local and in-memory backends
//! - **[`config`]**: TOML configuration (pattern, cap, debounce)
//! - **[`error`]**: error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sorted_files_core::{config::SortedFilesConfig, listing::SortedFiles};
//!
//! # async fn example() -> sorted_files_core::error::Result<()> {
//! let config = SortedFilesConfig::default().with_pattern(r"\.md$");
//! let mut session = SortedFiles::from_config(&config)?;
//! session.set_watched_root("/home/me/notes")?;
//! loop {
//!     session.step().await;
//!     for entry in session.display_list().iter() {
//!         println!("{}", entry.path().display());
//!     }
//! }
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! DirectoryWatcher ──change──▶ SortedFiles ──spawn──▶ Walker ──▶ FileSystem
//!                                   ▲                   │
//!                                   └──── entries ──────┘
//!                                   │
//!                                 rank ──▶ display list ──▶ ListEvent subscribers
//! ```

pub mod config;
pub mod error;
pub mod fs;
pub mod listing;
