//! Rebuild loop for one watching bundle.
//!
//! ```text
//! Watcher ──crossbeam──> bridge thread ──mpsc──> driver task
//!                                                  │ debounce (300ms quiet)
//!                                                  ▼
//!                                    spawn_blocking(request_compile)
//!                                                  │ timeout
//!                                                  ▼
//!                                             WatchStatus
//! ```
//!
//! A failed rebuild is reported and the loop keeps going with the last good
//! artifact, waiting for the next change. Run at most one driver per bundle:
//! drivers on the same bundle split its events between them.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError};
use tokio::sync::{mpsc, watch};

use super::{Bundle, BuildStamp};
use crate::error::{BundleError, Result};
use crate::logger::{status_error, status_success};
use crate::watch::{ChangeEvent, Debouncer};
use crate::{debug, log};

/// How often an idle bridge thread checks whether its driver stopped.
const BRIDGE_POLL: Duration = Duration::from_millis(200);

impl Bundle {
    /// Spawn [`Bundle::watch_until`] on the current tokio runtime.
    ///
    /// Returns `None` when the bundle is not watching.
    pub fn spawn_watch(
        self: &Arc<Self>,
        label: impl Into<String> + Send + 'static,
        limit: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Option<tokio::task::JoinHandle<()>> {
        self.changes.as_ref()?;
        Some(tokio::spawn(Arc::clone(self).watch_until(label, limit, shutdown)))
    }

    /// Rebuild on every debounced change batch until `shutdown` fires.
    ///
    /// `label` names the bundle in status lines. Each rebuild may take at
    /// most `limit`. Returns at once when the bundle is not watching.
    pub async fn watch_until(
        self: Arc<Self>,
        label: impl Into<String>,
        limit: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let label = label.into();
        let Some(changes) = self.changes() else {
            debug!("watch"; "{} has no watcher", label);
            return;
        };
        let (mut events, _bridge) = bridge(changes);
        let mut debouncer = Debouncer::default();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                event = events.recv() => match event {
                    Some(event) => debouncer.add_event(event),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    if let Some(batch) = debouncer.take_if_ready() {
                        rebuild(&label, &self, &batch, limit).await;
                    }
                }
            }
        }
        debug!("watch"; "{} stopped", label);
    }
}

/// Forward watcher events into an async channel.
///
/// The thread exits once the receiving side is dropped, even when no
/// further event arrives.
fn bridge(changes: Receiver<ChangeEvent>) -> (mpsc::Receiver<ChangeEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<ChangeEvent>(64);
    let handle = std::thread::spawn(move || {
        loop {
            match changes.recv_timeout(BRIDGE_POLL) {
                Ok(event) => {
                    if tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) if tx.is_closed() => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });
    (rx, handle)
}

/// Run one coalesced compile off the async workers and report it.
async fn rebuild(label: &str, bundle: &Arc<Bundle>, batch: &[ChangeEvent], limit: Duration) {
    for event in batch {
        debug!("watch"; "{}: {} changed", label, event.path.display());
    }

    let task = tokio::task::spawn_blocking({
        let bundle = Arc::clone(bundle);
        move || bundle.request_compile()
    });

    // on timeout the compile keeps running in the background and still
    // publishes its result when it lands
    let outcome = match tokio::time::timeout(limit, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            log!("error"; "compile task for {} panicked: {}", label, e);
            return;
        }
        Err(_) => Some(Err(BundleError::Timeout(limit))),
    };

    report(label, outcome);
}

fn report(label: &str, outcome: Option<Result<BuildStamp>>) {
    match outcome {
        None => debug!("watch"; "{}: folded into running compile", label),
        Some(Ok(stamp)) => status_success(&format!("rebuilt {label} → {}", stamp.name)),
        Some(Err(e)) => status_error(
            &format!("failed {label}"),
            &format!("{:#}", anyhow::Error::new(e)),
        ),
    }
}
