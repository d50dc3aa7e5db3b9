pub mod directory_watcher;
pub mod entry;
pub mod pattern;
pub mod ranker;
pub mod session;
pub mod walker;

pub use directory_watcher::{
    ChangeKind, ManualWatchBackend, NotifyWatchBackend, PathTarget, WatchBackend, WatchEvent, WatchHandle,
    WatchSink,
};
pub use entry::{FileEntry, FileKind, FileStat};
pub use pattern::Pattern;
pub use ranker::{SortDirection, SortKey, SortSpec, rank};
pub use session::{ListEvent, SessionState, SessionStatus, SortedFiles, Step};
pub use walker::Walker;
