//! At-most-one-in-flight compile per bundle.

use std::sync::atomic::{AtomicBool, Ordering};

/// Coalesces compile requests.
///
/// A request arriving while a compile runs only raises `pending`; the
/// running compile then loops once more, so a burst of requests collapses
/// into a single trailing compile.
#[derive(Debug, Default)]
pub struct CompileGate {
    in_flight: AtomicBool,
    pending: AtomicBool,
}

impl CompileGate {
    pub const fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    /// Try to become the running compile.
    ///
    /// Returns `false` when another compile is in flight; the request is
    /// then recorded as pending for it.
    pub fn try_begin(&self) -> bool {
        loop {
            if self
                .in_flight
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.pending.store(false, Ordering::SeqCst);
                return true;
            }
            self.pending.store(true, Ordering::SeqCst);
            if self.in_flight.load(Ordering::SeqCst) {
                return false;
            }
        }
    }

    /// Finish the running compile.
    ///
    /// Returns `true` when requests arrived meanwhile: the caller keeps the
    /// gate and must compile again.
    pub fn finish(&self) -> bool {
        if self.pending.swap(false, Ordering::SeqCst) {
            return true;
        }
        self.in_flight.store(false, Ordering::SeqCst);

        // A request may have slipped in between the swap and the release.
        if self.pending.load(Ordering::SeqCst)
            && self
                .in_flight
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            self.pending.store(false, Ordering::SeqCst);
            return true;
        }
        false
    }

    /// Hold the gate for one compile loop.
    ///
    /// The returned guard releases the gate when dropped, so a compile that
    /// panics does not wedge every later request.
    pub fn begin(&self) -> Option<GateGuard<'_>> {
        self.try_begin().then(|| GateGuard {
            gate: self,
            released: false,
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Running compile holding a [`CompileGate`].
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a CompileGate,
    released: bool,
}

impl GateGuard<'_> {
    /// See [`CompileGate::finish`]. Keeps the gate while it returns `true`.
    pub fn finish(&mut self) -> bool {
        let again = self.gate.finish();
        self.released = !again;
        again
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.gate.in_flight.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request_runs_once() {
        let gate = CompileGate::new();
        assert!(gate.try_begin());
        assert!(!gate.finish());
        assert!(!gate.is_in_flight());
    }

    #[test]
    fn test_burst_collapses_into_one_trailing_run() {
        let gate = CompileGate::new();
        assert!(gate.try_begin());

        // three requests while busy
        assert!(!gate.try_begin());
        assert!(!gate.try_begin());
        assert!(!gate.try_begin());
        assert!(gate.is_pending());

        // exactly one more round
        assert!(gate.finish());
        assert!(gate.is_in_flight());
        assert!(!gate.finish());
        assert!(!gate.is_in_flight());
    }

    #[test]
    fn test_gate_reusable_after_finish() {
        let gate = CompileGate::new();
        assert!(gate.try_begin());
        assert!(!gate.finish());
        assert!(gate.try_begin());
        assert!(!gate.is_pending());
        assert!(!gate.finish());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let gate = CompileGate::new();
        {
            let _guard = gate.begin().unwrap();
            assert!(gate.begin().is_none());
            // a refused request must not release the running one
            assert!(gate.is_in_flight());
        }
        assert!(!gate.is_in_flight());
        assert!(gate.begin().is_some());
    }

    #[test]
    fn test_guard_released_after_panic() {
        let gate = CompileGate::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = gate.begin().unwrap();
            panic!("compile blew up");
        }));
        assert!(result.is_err());
        assert!(!gate.is_in_flight());
        assert!(gate.begin().is_some());
    }

    #[test]
    fn test_concurrent_requests_never_run_twice_at_once() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let gate = Arc::new(CompileGate::new());
        let running = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let running = Arc::clone(&running);
                let overlap = Arc::clone(&overlap);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if !gate.try_begin() {
                            continue;
                        }
                        loop {
                            if running.fetch_add(1, Ordering::SeqCst) > 0 {
                                overlap.fetch_add(1, Ordering::SeqCst);
                            }
                            std::thread::yield_now();
                            running.fetch_sub(1, Ordering::SeqCst);
                            if !gate.finish() {
                                break;
                            }
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(overlap.load(Ordering::SeqCst), 0);
        assert!(!gate.is_in_flight());
    }
}
