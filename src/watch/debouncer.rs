use std::path::PathBuf;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::ChangeEvent;

pub const DEBOUNCE_MS: u64 = 300;

/// Pure debouncer: collapses a burst of change events into one batch.
///
/// Events for the same path merge: the earliest `previous` and the latest
/// `current` mtime are kept.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    changes: FxHashMap<PathBuf, ChangeEvent>,
    last_event: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MS))
    }
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            changes: FxHashMap::default(),
            last_event: None,
        }
    }

    pub fn add_event(&mut self, event: ChangeEvent) {
        self.last_event = Some(Instant::now());
        match self.changes.get_mut(&event.path) {
            Some(existing) => existing.current = event.current,
            None => {
                self.changes.insert(event.path.clone(), event);
            }
        }
    }

    /// Quiet window elapsed and something is pending.
    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        last_event.elapsed() >= self.window && !self.changes.is_empty()
    }

    /// Take the batch if the quiet window elapsed, sorted by path.
    pub fn take_if_ready(&mut self) -> Option<Vec<ChangeEvent>> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        let mut batch: Vec<_> = std::mem::take(&mut self.changes).into_values().collect();
        batch.sort_by(|a, b| a.path.cmp(&b.path));
        Some(batch)
    }

    pub fn pending(&self) -> usize {
        self.changes.len()
    }

    /// Precise sleep duration until next possible ready time.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };
        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}
