//! Change watcher with leading-edge debounce.
//!
//! Subscribes to every path in a [`DependencySet`] without recursion (the set
//! already lists each directory explicitly; files are watched through their
//! parent directory) and turns the raw notification
//! stream into [`Signal`]s. The first relevant event after a quiet window of
//! [`DEBOUNCE_WINDOW`] produces one `Changed` signal; the burst that follows
//! it is swallowed.

use crate::deps::DependencySet;
use crate::dev::ShutdownToken;
use crate::error::{CliError, Result};
use notify::event::{AccessKind, AccessMode, ModifyKind, MetadataKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Minimum spacing between two `Changed` signals.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// What the watcher reports to the orchestrator.
#[derive(Debug)]
pub enum Signal {
    /// Something on the watch set changed.
    Changed,
    /// The platform watcher reported a failure.
    Error(notify::Error),
}

/// Leading-edge rate limiter.
///
/// Starts "hot": events during the first window after creation are dropped,
/// since the initial build has just run.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_tick: Instant,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self::starting_at(window, Instant::now())
    }

    pub fn starting_at(window: Duration, now: Instant) -> Self {
        Self {
            window,
            last_tick: now,
        }
    }

    /// Decide whether an event of `kind` observed at `now` should fire.
    pub fn accept(&mut self, kind: &EventKind, now: Instant) -> bool {
        if !is_relevant_kind(kind) {
            return false;
        }
        if now.saturating_duration_since(self.last_tick) < self.window {
            return false;
        }
        self.last_tick = now;
        true
    }
}

/// Permission/ownership changes and reads never trigger a rebuild. Closing
/// a file opened for writing does, which is how a bare `touch` shows up.
pub fn is_relevant_kind(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        _ => true,
    }
}

/// Events touching only hidden entries (editor swap files and the like)
/// are ignored.
fn is_relevant_event(event: &Event) -> bool {
    let hidden = |path: &PathBuf| {
        path.file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(false)
    };
    event.paths.is_empty() || !event.paths.iter().all(hidden)
}

/// Debounce a raw notification stream.
///
/// The returned receiver closes when the raw stream ends or `shutdown` is
/// cancelled.
pub fn debounce(
    mut raw: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut debouncer: Debouncer,
    shutdown: ShutdownToken,
) -> mpsc::Receiver<Signal> {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = raw.recv() => next,
            };

            let signal = match next {
                None => break,
                Some(Ok(event)) => {
                    if !is_relevant_event(&event) || !debouncer.accept(&event.kind, Instant::now()) {
                        continue;
                    }
                    tracing::debug!(kind = ?event.kind, paths = ?event.paths, "Change detected");
                    Signal::Changed
                }
                Some(Err(e)) => Signal::Error(e),
            };

            if tx.send(signal).await.is_err() {
                break;
            }
        }
        tracing::debug!("Change watcher stopped");
    });

    rx
}

/// Which paths a set of platform subscriptions actually stands for.
///
/// A file in the dependency set is watched through its parent directory,
/// since editors that save by rename would otherwise leave the watch on a
/// deleted inode. Siblings seen through that parent are out of scope.
#[derive(Debug, Default)]
pub struct WatchScope {
    dirs: BTreeSet<PathBuf>,
    files: BTreeSet<PathBuf>,
}

impl WatchScope {
    pub fn covers(&self, path: &Path) -> bool {
        self.files.contains(path)
            || self.dirs.contains(path)
            || path.parent().is_some_and(|parent| self.dirs.contains(parent))
    }

    pub fn admits(&self, event: &Event) -> bool {
        event.paths.is_empty() || event.paths.iter().any(|path| self.covers(path))
    }
}

/// Live subscription to a dependency set.
pub struct ChangeWatcher {
    watcher: RecommendedWatcher,
    /// Requested path to the directory subscribed for it.
    watched: BTreeMap<PathBuf, PathBuf>,
    /// Subscribed directories and how many requested paths share each.
    subscriptions: BTreeMap<PathBuf, usize>,
    scope: Arc<RwLock<WatchScope>>,
}

impl ChangeWatcher {
    /// Watch every path in `paths` and start the debounce task.
    ///
    /// Fails if any path cannot be watched (for example, it does not exist).
    pub fn start(
        paths: &DependencySet,
        window: Duration,
        shutdown: ShutdownToken,
    ) -> Result<(Self, mpsc::Receiver<Signal>)> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let scope = Arc::new(RwLock::new(WatchScope::default()));
        let filter = scope.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = &res {
                if !filter.read().admits(event) {
                    return;
                }
            }
            let _ = raw_tx.send(res);
        })?;

        let mut this = Self {
            watcher,
            watched: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            scope,
        };
        for path in paths.iter() {
            this.watch(path)?;
        }
        tracing::debug!(
            paths = this.watched.len(),
            subscriptions = this.subscriptions.len(),
            "Watching dependencies"
        );

        let signals = debounce(raw_rx, Debouncer::new(window), shutdown);
        Ok((this, signals))
    }

    /// Paths currently watched.
    pub fn watched(&self) -> BTreeSet<PathBuf> {
        self.watched.keys().cloned().collect()
    }

    /// Directories subscribed with the platform watcher.
    pub fn subscriptions(&self) -> BTreeSet<PathBuf> {
        self.subscriptions.keys().cloned().collect()
    }

    /// Swap the subscription set for `paths`.
    ///
    /// Paths that can no longer be watched are logged and left out.
    pub fn replace(&mut self, paths: &DependencySet) {
        let next = paths.as_set();

        let removed: Vec<PathBuf> = self
            .watched
            .keys()
            .filter(|path| !next.contains(*path))
            .cloned()
            .collect();
        for path in removed {
            self.unwatch(&path);
        }

        let added: Vec<PathBuf> = next
            .iter()
            .filter(|path| !self.watched.contains_key(*path))
            .cloned()
            .collect();
        for path in added {
            if let Err(e) = self.watch(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to watch");
            }
        }
    }

    fn watch(&mut self, path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| CliError::Watch(notify::Error::io(e).add_path(path.to_path_buf())))?;
        let target = match path.parent() {
            Some(parent) if !metadata.is_dir() => parent.to_path_buf(),
            _ => path.to_path_buf(),
        };

        if !self.subscriptions.contains_key(&target) {
            self.watcher
                .watch(&target, RecursiveMode::NonRecursive)
                .map_err(CliError::Watch)?;
        }
        *self.subscriptions.entry(target.clone()).or_default() += 1;

        let mut scope = self.scope.write();
        if metadata.is_dir() {
            scope.dirs.insert(path.to_path_buf());
        } else {
            scope.files.insert(path.to_path_buf());
        }
        self.watched.insert(path.to_path_buf(), target);
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) {
        let Some(target) = self.watched.remove(path) else {
            return;
        };
        {
            let mut scope = self.scope.write();
            scope.dirs.remove(path);
            scope.files.remove(path);
        }

        let Some(count) = self.subscriptions.get_mut(&target) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.subscriptions.remove(&target);
            if let Err(e) = self.watcher.unwatch(&target) {
                tracing::debug!(path = %target.display(), error = %e, "Failed to unwatch");
            }
        }
    }
}
