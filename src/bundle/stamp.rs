//! Compiled state of a bundle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Result of one successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStamp {
    /// Output file name, `<fingerprint>.<ext>`.
    pub name: String,
    /// Absolute path the artifact was written to.
    pub path: PathBuf,
    /// Milliseconds since the UNIX epoch when the write completed.
    pub timestamp: u64,
}

impl BuildStamp {
    /// Cache-busting URL: `name?timestamp`.
    pub fn url(&self) -> String {
        format!("{}?{}", self.name, self.timestamp)
    }
}

/// Strictly increasing millisecond clock, one per bundle.
///
/// Two compiles finishing within the same millisecond still get distinct
/// timestamps, so the URL changes on every completed compile.
#[derive(Debug, Default)]
pub struct BuildClock {
    last: AtomicU64,
}

impl BuildClock {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Next timestamp: wall-clock milliseconds, bumped past the previous one.
    pub fn tick(&self) -> u64 {
        let now = now_ms();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }

    /// Last timestamp handed out, `0` before the first compile.
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_format() {
        let stamp = BuildStamp {
            name: "0123456789abcdef.js".into(),
            path: PathBuf::from("/site/assets/0123456789abcdef.js"),
            timestamp: 1_700_000_000_000,
        };
        assert_eq!(stamp.url(), "0123456789abcdef.js?1700000000000");
    }

    #[test]
    fn test_clock_strictly_increasing() {
        let clock = BuildClock::new();
        let mut prev = 0;
        for _ in 0..1000 {
            let t = clock.tick();
            assert!(t > prev);
            prev = t;
        }
        assert_eq!(clock.last(), prev);
    }

    #[test]
    fn test_clock_near_wall_time() {
        let clock = BuildClock::new();
        let t = clock.tick();
        assert!(t.abs_diff(now_ms()) < 60_000);
    }
}
