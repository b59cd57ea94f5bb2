//! Count-based log rate limiting.
//!
//! There is no wall clock in every environment this runs in, so the limiter
//! lets a burst through and then samples one event in every `interval`.

use core::sync::atomic::{AtomicU32, Ordering};

/// Decides whether a repeated diagnostic should be emitted.
#[derive(Debug)]
pub struct RateLimit {
    burst: u32,
    interval: u32,
    seen: AtomicU32,
}

impl RateLimit {
    /// Allow the first `burst` events, then every `interval`-th one.
    pub const fn new(burst: u32, interval: u32) -> Self {
        Self {
            burst,
            interval,
            seen: AtomicU32::new(0),
        }
    }

    /// Record one event and report whether it should be logged.
    pub fn check(&self) -> bool {
        let n = self.seen.fetch_add(1, Ordering::Relaxed);
        if n < self.burst {
            return true;
        }
        self.interval != 0 && (n - self.burst) % self.interval == self.interval - 1
    }

    /// Total events recorded so far, including suppressed ones.
    pub fn events(&self) -> u32 {
        self.seen.load(Ordering::Relaxed)
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::new(10, 100)
    }
}
