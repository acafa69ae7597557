//! Content directory watcher for automatic reloads.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Watches the content root and reports that something changed.
///
/// Events are not debounced here; the reload limiter coalesces bursts.
pub struct ContentWatcher {
    root: PathBuf,
    change_tx: mpsc::UnboundedSender<PathBuf>,
}

impl ContentWatcher {
    /// Create a new ContentWatcher.
    ///
    /// Returns the watcher and a receiver of changed paths.
    pub fn new(root: &Path) -> (Self, mpsc::UnboundedReceiver<PathBuf>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching in a background thread. Dropping the returned
    /// watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();
        let root = self.root.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                        return;
                    }
                    if let Some(path) = event.paths.into_iter().find(|p| !is_ignored(&root, p)) {
                        tracing::debug!(path = %path.display(), "Content change detected");
                        let _ = tx.send(path);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        tracing::info!(root = ?self.root, "Content watcher started");
        Ok(watcher)
    }
}

/// Changes inside hidden entries below `root` (`.git`, editor swap files)
/// never affect the compiled tree.
pub fn is_ignored(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|c| match c {
        Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('.')),
        _ => false,
    })
}
