//! Change watcher for bundle sources.
//!
//! ```text
//! notify (parent dirs) → WatchState (mtime compare) → ChangeEvent channel → Debouncer → compile
//! ```
//!
//! The backend observes each watched file's parent directory, so editors
//! that save through a rename keep being tracked. Every backend event is
//! reduced to one question: did the file's modification time change? Only a
//! differing mtime produces a [`ChangeEvent`], which absorbs the duplicate
//! notifications OS layers fire for attribute or access noise.
//!
//! Paths that are not regular files when added are ignored for good: a file
//! created later at that path is not picked up.

mod debouncer;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crossbeam::channel::{Receiver, Sender, TrySendError};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::files::{get_mtime, is_file};

pub use debouncer::{DEBOUNCE_MS, Debouncer};

/// Undelivered events a watcher queues before dropping new ones.
pub const QUEUE_CAPACITY: usize = 256;

/// A watched file's modification time changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub previous: SystemTime,
    pub current: SystemTime,
}

/// Compare two mtime snapshots of `path`.
///
/// Returns an event only when they differ.
pub fn detect_change(path: &Path, previous: SystemTime, current: SystemTime) -> Option<ChangeEvent> {
    (previous != current).then(|| ChangeEvent {
        path: path.to_path_buf(),
        previous,
        current,
    })
}

/// A watched file as the bundle named it.
#[derive(Debug)]
struct Entry {
    path: PathBuf,
    mtime: SystemTime,
}

/// Bookkeeping shared with the notify callback thread.
///
/// Backends report canonical paths (FSEvents resolves `/var` to
/// `/private/var`), so lookups go by canonical path and events carry the
/// path the file was added under.
#[derive(Debug, Default)]
struct WatchState {
    /// Canonical path → watched file
    files: FxHashMap<PathBuf, Entry>,
    /// Path as added → canonical path
    aliases: FxHashMap<PathBuf, PathBuf>,
    /// Canonical parent directory → number of watched files inside
    dirs: FxHashMap<PathBuf, usize>,
}

impl WatchState {
    fn insert(&mut self, path: &Path, canonical: PathBuf, mtime: SystemTime) {
        self.aliases.insert(path.to_path_buf(), canonical.clone());
        self.files.insert(
            canonical,
            Entry {
                path: path.to_path_buf(),
                mtime,
            },
        );
    }

    /// Re-stat the canonical `path` and record a new mtime.
    ///
    /// Unwatched paths and stat failures yield nothing.
    fn check(&mut self, path: &Path) -> Option<ChangeEvent> {
        let entry = self.files.get_mut(path)?;
        let current = get_mtime(path)?;
        let change = detect_change(&entry.path, entry.mtime, current)?;
        entry.mtime = current;
        Some(change)
    }
}

/// Observes a set of files for modification-time changes.
pub struct Watcher {
    backend: RecommendedWatcher,
    state: Arc<Mutex<WatchState>>,
}

impl Watcher {
    /// Create a watcher delivering events to `tx`.
    pub fn new(tx: Sender<ChangeEvent>) -> notify::Result<Self> {
        let state = Arc::new(Mutex::new(WatchState::default()));
        let shared = Arc::clone(&state);

        let backend = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    crate::debug!("watch"; "notify error: {}", e);
                    return;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
            ) {
                return;
            }

            let changes: Vec<ChangeEvent> = {
                let mut state = shared.lock();
                event.paths.iter().filter_map(|p| state.check(p)).collect()
            };
            for change in changes {
                crate::debug!("watch"; "changed: {}", change.path.display());
                // A full queue already guarantees a rebuild; a closed one
                // means the owning bundle is gone.
                if let Err(TrySendError::Full(change)) = tx.try_send(change) {
                    crate::debug!("watch"; "queue full, dropped {}", change.path.display());
                }
            }
        })?;

        Ok(Self { backend, state })
    }

    /// Create a watcher together with its event receiver.
    ///
    /// The queue holds at most [`QUEUE_CAPACITY`] undelivered events.
    pub fn channel() -> notify::Result<(Self, Receiver<ChangeEvent>)> {
        let (tx, rx) = crossbeam::channel::bounded(QUEUE_CAPACITY);
        Ok((Self::new(tx)?, rx))
    }

    /// Start observing `path`.
    ///
    /// Returns `false` without error when the path is not a regular file
    /// or is already watched.
    pub fn watch(&mut self, path: &Path) -> bool {
        if !is_file(path) {
            crate::debug!("watch"; "not a file, skipped: {}", path.display());
            return false;
        }
        let Ok(canonical) = path.canonicalize() else {
            return false;
        };
        let Some(mtime) = get_mtime(&canonical) else {
            return false;
        };
        let dir = parent_dir(&canonical);

        // Never hold the state lock across backend calls: the callback
        // thread takes the same lock.
        let attach = {
            let mut state = self.state.lock();
            if state.aliases.contains_key(path) || state.files.contains_key(&canonical) {
                return false;
            }
            state.insert(path, canonical.clone(), mtime);
            let count = state.dirs.entry(dir.clone()).or_insert(0);
            *count += 1;
            *count == 1
        };

        if attach && let Err(e) = self.backend.watch(&dir, RecursiveMode::NonRecursive) {
            crate::log!("watch"; "cannot watch {}: {}", dir.display(), e);
            let mut state = self.state.lock();
            state.aliases.remove(path);
            state.files.remove(&canonical);
            state.dirs.remove(&dir);
            return false;
        }

        crate::debug!("watch"; "watching {}", path.display());
        true
    }

    /// Stop observing `path`. No-op when it was not watched.
    pub fn unwatch(&mut self, path: &Path) -> bool {
        let (dir, detach) = {
            let mut state = self.state.lock();
            let Some(canonical) = state.aliases.remove(path) else {
                return false;
            };
            state.files.remove(&canonical);
            let dir = parent_dir(&canonical);
            let detach = match state.dirs.get_mut(&dir) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                _ => {
                    state.dirs.remove(&dir);
                    true
                }
            };
            (dir, detach)
        };

        if detach {
            let _ = self.backend.unwatch(&dir);
        }
        crate::debug!("watch"; "unwatched {}", path.display());
        true
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.state.lock().aliases.contains_key(path)
    }

    /// Currently watched files as they were added, sorted.
    pub fn watched(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = self.state.lock().aliases.keys().cloned().collect();
        files.sort();
        files
    }

    pub fn len(&self) -> usize {
        self.state.lock().aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
