// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Source file watching and reload broadcast
//!
//! Every directory under the project root gets its own watch, except the
//! dependency, build and version-control trees. Create and modify events on
//! front-end sources re-arm a debounce timer; when it fires, every reload
//! subscriber receives `{"type":"reload"}`.

use crate::error::ServerResult;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const RELOAD_MESSAGE: &str = r#"{"type":"reload"}"#;

const IGNORED_SEGMENTS: &[&str] = &["node_modules", ".git", "dist", "build", ".next"];

const WATCHED_EXTENSIONS: &[&str] = &[
    "vue", "jsx", "tsx", "js", "ts", "css", "scss", "sass", "less", "html",
];

pub type SubscriberId = Uuid;

/// Open reload connections keyed by subscriber id
pub type Subscribers = Arc<RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<String>>>>;

/// Whether a change to `path` should reload the page
pub fn is_relevant(path: &Path) -> bool {
    let ignored = path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|segment| IGNORED_SEGMENTS.contains(&segment))
    });
    if ignored {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WATCHED_EXTENSIONS.contains(&ext))
}

fn is_ignored_dir(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| IGNORED_SEGMENTS.contains(&name))
}

/// Directories under `root` (itself included) that get a watch.
///
/// Ignored trees are not descended into. Unreadable subdirectories are
/// skipped; an unreadable root is an error.
pub fn watch_targets(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut targets = vec![root.to_path_buf()];
    let mut pending = vec![std::fs::read_dir(root)?];

    while let Some(entries) = pending.pop() {
        for entry in entries.flatten() {
            // file_type does not follow symlinks, so linked trees are left alone
            let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
            let path = entry.path();
            if !is_dir || is_ignored_dir(&path) {
                continue;
            }
            match std::fs::read_dir(&path) {
                Ok(children) => pending.push(children),
                Err(e) => {
                    debug!(dir = %path.display(), error = %e, "Skipping unreadable directory");
                    continue;
                }
            }
            targets.push(path);
        }
    }
    Ok(targets)
}

fn qualifies(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|path| is_relevant(path))
}

struct Running {
    // Dropping the watcher stops event delivery
    _watcher: Option<RecommendedWatcher>,
    debounce: JoinHandle<()>,
}

pub struct FileWatcher {
    subscribers: Subscribers,
    running: Mutex<Option<Running>>,
    watched_dirs: usize,
}

impl FileWatcher {
    /// Watch the source directories under `root` and broadcast reloads after
    /// `debounce` of quiet.
    ///
    /// Directories created after startup are not picked up.
    pub fn start(root: &Path, debounce: Duration) -> ServerResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if qualifies(&event) {
                    debug!(paths = ?event.paths, "Source change detected");
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!("File watcher error: {}", e),
        })?;
        let mut watched_dirs = 0;
        for dir in watch_targets(root).map_err(notify::Error::io)? {
            match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => watched_dirs += 1,
                Err(e) if dir == root => return Err(e.into()),
                Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to watch directory"),
            }
        }
        info!(dirs = watched_dirs, "Watching {} for changes", root.display());

        let mut this = Self::with_parts(Some(watcher), rx, debounce);
        this.watched_dirs = watched_dirs;
        Ok(this)
    }

    /// A watcher driven by `triggers` instead of the filesystem
    pub fn from_triggers(triggers: mpsc::UnboundedReceiver<()>, debounce: Duration) -> Self {
        Self::with_parts(None, triggers, debounce)
    }

    fn with_parts(
        watcher: Option<RecommendedWatcher>,
        triggers: mpsc::UnboundedReceiver<()>,
        debounce: Duration,
    ) -> Self {
        let subscribers: Subscribers = Arc::default();
        let task = tokio::spawn(debounce_loop(triggers, subscribers.clone(), debounce));
        Self {
            subscribers,
            running: Mutex::new(Some(Running { _watcher: watcher, debounce: task })),
            watched_dirs: 0,
        }
    }

    /// Register a reload connection
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id, tx);
        debug!(subscriber = %id, total = subscribers.len(), "Reload client connected");
        (id, rx)
    }

    pub async fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.remove(&id);
        debug!(subscriber = %id, total = subscribers.len(), "Reload client disconnected");
    }

    /// Number of directories with a registered watch
    pub fn watched_dirs(&self) -> usize {
        self.watched_dirs
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Send a reload to every subscriber now, returning how many received it
    pub async fn broadcast_reload(&self) -> usize {
        broadcast(&self.subscribers).await
    }

    /// Stop watching. Safe to call more than once.
    pub fn close(&self) {
        let running = match self.running.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(running) = running {
            running.debounce.abort();
            info!("File watcher stopped");
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

async fn broadcast(subscribers: &Subscribers) -> usize {
    let subscribers = subscribers.read().await;
    let delivered = subscribers
        .values()
        .filter(|tx| tx.send(RELOAD_MESSAGE.to_string()).is_ok())
        .count();
    info!(clients = delivered, "Reloading browsers");
    delivered
}

async fn debounce_loop(
    mut triggers: mpsc::UnboundedReceiver<()>,
    subscribers: Subscribers,
    window: Duration,
) {
    while triggers.recv().await.is_some() {
        let sleep = tokio::time::sleep_until(Instant::now() + window);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => break,
                more = triggers.recv() => {
                    if more.is_none() {
                        break;
                    }
                    sleep.as_mut().reset(Instant::now() + window);
                }
            }
        }

        broadcast(&subscribers).await;
    }
}
