//! The refresh state machine tying walker, ranker and watcher together.
//!
//! A [`SortedFiles`] owns one watched root at a time, the current sort spec,
//! the last walked entry set and the ranked display list derived from it.
//!
//! ## States
//!
//! ```text
//!            set_watched_root            walk applied
//!   Idle ───────────────────▶ Refreshing ─────────────▶ Watching
//!    ▲                             ▲                        │
//!    │ clear_watched_root          └── matching change ─────┘
//!    └──────────────────────────────── (any state)
//! ```
//!
//! ## Generations
//!
//! Every root change bumps a generation counter. Walk results and watch
//! events carry the generation they were started under, and anything from an
//! older generation is dropped on arrival. A walk for a superseded root may
//! still finish in the background but can never overwrite the display.
//!
//! ## Coalescing
//!
//! At most one walk per generation is in flight. Refresh requests arriving
//! meanwhile set a single pending flag that starts one follow-up walk when the
//! in-flight one completes.

use super::directory_watcher::{
    NotifyWatchBackend, PathTarget, WatchBackend, WatchEvent, WatchHandle, WatchSink,
};
use super::entry::FileEntry;
use super::pattern::Pattern;
use super::ranker::{SortKey, SortSpec, rank};
use super::walker::Walker;
use crate::config::SortedFilesConfig;
use crate::error::{FsErrorKind, Result, SortedFilesError};
use crate::fs::{FileSystem, LocalFileSystem};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Capacity of the change notification channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// No root selected
    Idle,
    /// A walk for the current root is in flight
    Refreshing,
    /// Root set, watch installed, display up to date
    Watching,
}

/// Notification fired whenever the display list changes or a refresh fails
#[derive(Debug, Clone)]
pub enum ListEvent {
    /// The display list was replaced
    Replaced {
        entries: Arc<Vec<FileEntry>>,
        sort: SortSpec,
    },
    /// The watched root could not be walked; the display was left untouched
    RefreshFailed {
        root: PathBuf,
        kind: Option<FsErrorKind>,
        message: String,
    },
}

/// What a call to [`SortedFiles::step`] handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A walk finished and its result is now displayed
    Refreshed { entries: usize },
    /// The current root could not be walked
    RefreshFailed,
    /// A walk or event from a superseded root was dropped
    Discarded,
    /// A matching change started a walk
    RefreshStarted,
    /// A matching change arrived while a walk was in flight
    RefreshQueued,
    /// A change to a non-matching file was ignored
    EventIgnored,
}

/// Serializable snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub root: Option<PathBuf>,
    pub state: SessionState,
    pub sort: SortSpec,
    pub pattern: String,
    pub max_items: usize,
    pub walked_entries: usize,
    pub displayed_entries: usize,
    pub refresh_pending: bool,
    pub last_error: Option<String>,
}

struct WalkOutcome {
    generation: u64,
    root: PathBuf,
    result: Result<Vec<FileEntry>>,
}

struct WatchedRoot {
    path: PathBuf,
    watch: Option<Box<dyn WatchHandle>>,
}

impl WatchedRoot {
    fn close(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.close();
        }
    }
}

/// A live, sorted, capped listing of one watched directory.
pub struct SortedFiles {
    walker: Walker,
    watch_backend: Arc<dyn WatchBackend>,
    max_items: usize,
    state: SessionState,
    root: Option<WatchedRoot>,
    generation: u64,
    sort: SortSpec,
    walked: Arc<Vec<FileEntry>>,
    display: Arc<Vec<FileEntry>>,
    in_flight: bool,
    refresh_pending: bool,
    last_error: Option<String>,
    watch_tx: flume::Sender<WatchEvent>,
    watch_rx: flume::Receiver<WatchEvent>,
    walk_tx: mpsc::UnboundedSender<WalkOutcome>,
    walk_rx: mpsc::UnboundedReceiver<WalkOutcome>,
    notifier: broadcast::Sender<ListEvent>,
}

impl std::fmt::Debug for SortedFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortedFiles")
            .field("root", &self.watched_root())
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("sort", &self.sort)
            .field("displayed", &self.display.len())
            .finish_non_exhaustive()
    }
}

impl SortedFiles {
    /// Create an idle session.
    ///
    /// # Arguments
    /// * `fs` - Filesystem the walker lists and stats through
    /// * `watch_backend` - Installs the recursive watch on the root
    /// * `pattern` - Filename rule for both walk results and change events
    /// * `max_items` - Cap on the displayed list, must be positive
    pub fn new(
        fs: Arc<dyn FileSystem>,
        watch_backend: Arc<dyn WatchBackend>,
        pattern: Pattern,
        max_items: usize,
    ) -> Result<Self> {
        if max_items == 0 {
            return Err(SortedFilesError::invalid_config(
                "max_items must be a positive integer",
            ));
        }
        let (watch_tx, watch_rx) = flume::unbounded();
        let (walk_tx, walk_rx) = mpsc::unbounded_channel();
        let (notifier, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            walker: Walker::new(fs, pattern),
            watch_backend,
            max_items,
            state: SessionState::Idle,
            root: None,
            generation: 0,
            sort: SortSpec::default(),
            walked: Arc::new(Vec::new()),
            display: Arc::new(Vec::new()),
            in_flight: false,
            refresh_pending: false,
            last_error: None,
            watch_tx,
            watch_rx,
            walk_tx,
            walk_rx,
            notifier,
        })
    }

    /// Create an idle session over the local disk with a `notify` watcher.
    pub fn from_config(config: &SortedFilesConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            Arc::new(LocalFileSystem::new()),
            Arc::new(NotifyWatchBackend::new(config.debounce())),
            config.compile_pattern()?,
            config.max_items,
        )
    }

    // Accessors

    /// The current ranked, capped list.
    pub fn display_list(&self) -> Arc<Vec<FileEntry>> {
        Arc::clone(&self.display)
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.sort
    }

    pub fn watched_root(&self) -> Option<&Path> {
        self.root.as_ref().map(|r| r.path.as_path())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pattern(&self) -> &Pattern {
        self.walker.pattern()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Subscribe to display changes and refresh failures.
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.notifier.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            root: self.watched_root().map(Path::to_path_buf),
            state: self.state,
            sort: self.sort,
            pattern: self.pattern().as_str().to_string(),
            max_items: self.max_items,
            walked_entries: self.walked.len(),
            displayed_entries: self.display.len(),
            refresh_pending: self.refresh_pending,
            last_error: self.last_error.clone(),
        }
    }

    /// Replace the watched root.
    ///
    /// The previous watch is closed before the new one is installed, the list
    /// empties, the sort resets to newest first, and a refresh starts
    /// immediately. The session stays `Refreshing` until that first walk is
    /// applied; if it fails the list stays empty.
    ///
    /// # Errors
    /// When the watch cannot be installed. The session is then idle.
    pub fn set_watched_root(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.close_root();
        self.generation += 1;
        info!("Watching {} (generation {})", path.display(), self.generation);

        let sink = WatchSink::new(self.generation, self.watch_tx.clone());
        let watch = match self.watch_backend.watch_recursive(&path, sink) {
            Ok(watch) => watch,
            Err(e) => {
                warn!("Failed to watch {}: {}", path.display(), e);
                self.reset_display();
                self.last_error = Some(e.to_string());
                self.publish();
                return Err(e);
            }
        };

        self.root = Some(WatchedRoot {
            path,
            watch: Some(watch),
        });
        self.reset_display();
        self.last_error = None;
        self.publish();
        self.start_walk();
        Ok(())
    }

    /// Stop watching and empty the list.
    pub fn clear_watched_root(&mut self) {
        if self.root.is_none() {
            return;
        }
        self.close_root();
        self.generation += 1;
        self.reset_display();
        self.publish();
        info!("No folder watched");
    }

    /// Select a sort key and re-rank the last walked set without walking.
    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort.select(key);
        debug!("Sorting by {} {:?}", self.sort.key, self.sort.direction);
        self.display = Arc::new(rank(&self.walked, self.sort, self.max_items));
        self.publish();
    }

    /// Request a refresh of the current root.
    ///
    /// Returns `None` when idle, otherwise whether a walk started now or was
    /// folded into the one already in flight.
    pub fn refresh(&mut self) -> Option<Step> {
        self.root.as_ref()?;
        if self.in_flight {
            self.refresh_pending = true;
            Some(Step::RefreshQueued)
        } else {
            self.start_walk();
            Some(Step::RefreshStarted)
        }
    }

    /// Wait for and handle one incoming walk result or change event.
    ///
    /// Cancel safe: dropping the future before it completes loses nothing.
    pub async fn step(&mut self) -> Step {
        tokio::select! {
            Some(outcome) = self.walk_rx.recv() => self.apply_walk(outcome),
            Ok(event) = self.watch_rx.recv_async() => self.handle_change(event),
        }
    }

    fn handle_change(&mut self, event: WatchEvent) -> Step {
        if event.generation != self.generation || self.root.is_none() {
            debug!("Dropping stale change for {}", event.path.display());
            return Step::Discarded;
        }
        if !self.is_relevant(&event) {
            debug!("Ignoring change to {}", event.path.display());
            return Step::EventIgnored;
        }
        debug!(
            "Change to {} ({:?}, {:?})",
            event.path.display(),
            event.kind,
            event.target
        );
        self.refresh().unwrap_or(Step::Discarded)
    }

    /// Whether a change can alter the walked set.
    ///
    /// Files count when their name matches. Directories always count: a
    /// directory created with files already inside reports only itself. A
    /// vanished path counts when it was, or contained, a walked entry.
    fn is_relevant(&self, event: &WatchEvent) -> bool {
        match event.target {
            PathTarget::File => self.pattern().matches_path(&event.path),
            PathTarget::Directory => true,
            PathTarget::Missing => {
                self.pattern().matches_path(&event.path)
                    || self
                        .walked
                        .iter()
                        .any(|entry| entry.path().starts_with(&event.path))
            }
        }
    }

    fn apply_walk(&mut self, outcome: WalkOutcome) -> Step {
        if outcome.generation != self.generation {
            debug!(
                "Discarding walk of {} from generation {}",
                outcome.root.display(),
                outcome.generation
            );
            return Step::Discarded;
        }
        self.in_flight = false;

        let step = match outcome.result {
            Ok(entries) => {
                self.walked = Arc::new(entries);
                self.display = Arc::new(rank(&self.walked, self.sort, self.max_items));
                self.last_error = None;
                info!(
                    "Refreshed {}: {} matching, {} shown",
                    outcome.root.display(),
                    self.walked.len(),
                    self.display.len()
                );
                self.publish();
                Step::Refreshed {
                    entries: self.display.len(),
                }
            }
            Err(e) => {
                warn!("Refresh of {} failed: {}", outcome.root.display(), e);
                self.last_error = Some(e.to_string());
                let _ = self.notifier.send(ListEvent::RefreshFailed {
                    root: outcome.root,
                    kind: e.fs_kind(),
                    message: e.to_string(),
                });
                Step::RefreshFailed
            }
        };

        if std::mem::take(&mut self.refresh_pending) {
            self.start_walk();
        } else {
            self.state = SessionState::Watching;
        }
        step
    }

    fn start_walk(&mut self) {
        let Some(root) = self.root.as_ref().map(|r| r.path.clone()) else {
            return;
        };
        self.in_flight = true;
        self.refresh_pending = false;
        self.state = SessionState::Refreshing;

        let walker = self.walker.clone();
        let tx = self.walk_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = walker.walk(&root).await;
            // The session may be gone; nothing to deliver to then
            let _ = tx.send(WalkOutcome {
                generation,
                root,
                result,
            });
        });
    }

    fn close_root(&mut self) {
        if let Some(mut root) = self.root.take() {
            root.close();
            debug!("Closed watch on {}", root.path.display());
        }
        self.in_flight = false;
        self.refresh_pending = false;
    }

    fn reset_display(&mut self) {
        self.state = SessionState::Idle;
        self.walked = Arc::new(Vec::new());
        self.display = Arc::new(Vec::new());
        self.sort = SortSpec::default();
    }

    fn publish(&self) {
        // No subscribers is fine
        let _ = self.notifier.send(ListEvent::Replaced {
            entries: Arc::clone(&self.display),
            sort: self.sort,
        });
    }
}

impl Drop for SortedFiles {
    fn drop(&mut self) {
        self.close_root();
    }
}
