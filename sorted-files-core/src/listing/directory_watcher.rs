use crate::error::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// What kind of change was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A single change, settled within the debounce window
    Any,
    /// Changes still ongoing when the debounce window elapsed
    Continuous,
}

/// What the changed path is now, as seen when the change was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTarget {
    /// A file or anything else that is not a directory
    File,
    Directory,
    /// Removed or renamed away
    Missing,
}

impl PathTarget {
    /// Inspect `path` on the local disk without following symlinks.
    pub fn of(path: &Path) -> Self {
        match std::fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_dir() => PathTarget::Directory,
            Ok(_) => PathTarget::File,
            Err(_) => PathTarget::Missing,
        }
    }
}

/// A change notification tagged with the generation of the watch it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub generation: u64,
    pub kind: ChangeKind,
    pub target: PathTarget,
    pub path: PathBuf,
}

/// Delivery end handed to a watch backend.
///
/// Every event is stamped with the sink's generation. Once [`WatchSink::disarm`]
/// has returned, nothing more is delivered through this sink or its clones.
#[derive(Debug, Clone)]
pub struct WatchSink {
    generation: u64,
    armed: Arc<Mutex<bool>>,
    tx: flume::Sender<WatchEvent>,
}

impl WatchSink {
    pub fn new(generation: u64, tx: flume::Sender<WatchEvent>) -> Self {
        Self {
            generation,
            armed: Arc::new(Mutex::new(true)),
            tx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn armed(&self) -> MutexGuard<'_, bool> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Forward a change to a regular file.
    pub fn emit(&self, kind: ChangeKind, path: PathBuf) -> bool {
        self.emit_target(kind, PathTarget::File, path)
    }

    /// Forward one change. Returns false once the sink is disarmed or the
    /// receiving side is gone.
    pub fn emit_target(&self, kind: ChangeKind, target: PathTarget, path: PathBuf) -> bool {
        // Held across the send so disarm cannot interleave
        let armed = self.armed();
        if !*armed {
            return false;
        }
        self.tx
            .send(WatchEvent {
                generation: self.generation,
                kind,
                target,
                path,
            })
            .is_ok()
    }

    /// Stop delivery. Waits for an emit already in progress.
    pub fn disarm(&self) {
        *self.armed() = false;
    }

    pub fn is_armed(&self) -> bool {
        *self.armed()
    }
}

/// An installed recursive watch.
pub trait WatchHandle: Send {
    /// Stop watching. No notification is delivered after this returns.
    fn close(self: Box<Self>);
}

/// Installs recursive watches on directories
pub trait WatchBackend: Send + Sync {
    fn watch_recursive(&self, root: &Path, sink: WatchSink) -> Result<Box<dyn WatchHandle>>;
}

/// Watch backend built on `notify` with debouncing.
#[derive(Debug, Clone)]
pub struct NotifyWatchBackend {
    debounce: Duration,
}

impl NotifyWatchBackend {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }
}

impl Default for NotifyWatchBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

struct NotifyWatch {
    sink: WatchSink,
    debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl WatchHandle for NotifyWatch {
    fn close(self: Box<Self>) {
        // Disarm first: the debouncer thread may still be mid-callback
        self.sink.disarm();
        drop(self.debouncer);
    }
}

impl WatchBackend for NotifyWatchBackend {
    fn watch_recursive(&self, root: &Path, sink: WatchSink) -> Result<Box<dyn WatchHandle>> {
        let callback_sink = sink.clone();
        let mut debouncer = notify_debouncer_mini::new_debouncer(
            self.debounce,
            move |res: DebounceEventResult| match res {
                Ok(events) => {
                    for ev in events {
                        let kind = match ev.kind {
                            DebouncedEventKind::AnyContinuous => ChangeKind::Continuous,
                            _ => ChangeKind::Any,
                        };
                        let target = PathTarget::of(&ev.path);
                        if !callback_sink.emit_target(kind, target, ev.path) {
                            break;
                        }
                    }
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            },
        )?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)?;
        tracing::debug!("Watching {} recursively", root.display());

        Ok(Box::new(NotifyWatch { sink, debouncer }))
    }
}

/// A watch backend driven by hand.
///
/// Records every sink it is given and lets the caller inject changes. Useful
/// for tests and for hosts that already have their own change feed.
#[derive(Debug, Clone, Default)]
pub struct ManualWatchBackend {
    sinks: Arc<Mutex<Vec<(PathBuf, WatchSink)>>>,
}

impl ManualWatchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(PathBuf, WatchSink)>> {
        self.sinks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver a file change to every watch still open. Returns how many took it.
    pub fn emit(&self, kind: ChangeKind, path: impl Into<PathBuf>) -> usize {
        self.emit_target(kind, PathTarget::File, path)
    }

    /// Deliver a change to a path of the given kind to every open watch.
    pub fn emit_target(&self, kind: ChangeKind, target: PathTarget, path: impl Into<PathBuf>) -> usize {
        let path = path.into();
        self.lock()
            .iter()
            .filter(|(_, sink)| sink.emit_target(kind, target, path.clone()))
            .count()
    }

    /// Deliver a change through the sinks installed for `root` only.
    /// Returns whether any accepted it; closed watches refuse.
    pub fn emit_for(&self, root: &Path, kind: ChangeKind, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        self.lock()
            .iter()
            .filter(|(watched, _)| watched == root)
            .any(|(_, sink)| sink.emit(kind, path.clone()))
    }

    /// Roots with a watch that has not been closed
    pub fn active_roots(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter(|(_, sink)| sink.is_armed())
            .map(|(root, _)| root.clone())
            .collect()
    }
}

struct ManualWatch {
    sink: WatchSink,
}

impl WatchHandle for ManualWatch {
    fn close(self: Box<Self>) {
        self.sink.disarm();
    }
}

impl WatchBackend for ManualWatchBackend {
    fn watch_recursive(&self, root: &Path, sink: WatchSink) -> Result<Box<dyn WatchHandle>> {
        self.lock().push((root.to_path_buf(), sink.clone()));
        Ok(Box::new(ManualWatch { sink }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use tokio::time::timeout;

    #[test]
    fn test_disarmed_sink_delivers_nothing() {
        let (tx, rx) = flume::unbounded();
        let sink = WatchSink::new(7, tx);
        assert!(sink.emit(ChangeKind::Any, PathBuf::from("/a")));

        let clone = sink.clone();
        sink.disarm();
        assert!(!clone.emit(ChangeKind::Any, PathBuf::from("/b")));
        assert!(!clone.is_armed());

        let received: Vec<_> = rx.drain().collect();
        assert_eq!(
            received,
            vec![WatchEvent {
                generation: 7,
                kind: ChangeKind::Any,
                target: PathTarget::File,
                path: PathBuf::from("/a"),
            }]
        );
    }

    #[test]
    fn test_nothing_arrives_after_disarm_returns() {
        let (tx, rx) = flume::unbounded();
        let sink = WatchSink::new(1, tx);
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let emitters: Vec<_> = (0..4)
            .map(|i| {
                let sink = sink.clone();
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                        sink.emit(ChangeKind::Continuous, PathBuf::from(format!("/f{i}")));
                    }
                })
            })
            .collect();

        std::thread::sleep(Duration::from_millis(20));
        sink.disarm();
        let delivered = rx.len();
        std::thread::sleep(Duration::from_millis(20));
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        for emitter in emitters {
            emitter.join().unwrap();
        }
        assert_eq!(rx.len(), delivered);
    }

    #[test]
    fn test_path_target_inspects_disk() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("f.txt");
        fs::write(&file, "x")?;
        assert_eq!(PathTarget::of(dir.path()), PathTarget::Directory);
        assert_eq!(PathTarget::of(&file), PathTarget::File);
        assert_eq!(PathTarget::of(&dir.path().join("gone")), PathTarget::Missing);
        Ok(())
    }

    #[tokio::test]
    async fn test_notify_backend_reports_changes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let (tx, rx) = flume::unbounded();
        let backend = NotifyWatchBackend::new(Duration::from_millis(50));
        let handle = backend.watch_recursive(dir.path(), WatchSink::new(1, tx))?;

        fs::write(dir.path().join("new.txt"), "hello")?;

        let event = timeout(Duration::from_secs(5), rx.recv_async()).await??;
        assert_eq!(event.generation, 1);
        assert!(event.path.ends_with("new.txt") || event.path.starts_with(dir.path()));

        handle.close();
        Ok(())
    }
}
