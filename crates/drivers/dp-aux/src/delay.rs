//! Sleeping between AUX retries.
//!
//! Every wait in this crate is a bounded range sleep, mirroring how the
//! hardware docs phrase retry intervals ("at least X, no more than Y").

/// Interval between AUX retries, in microseconds.
pub const AUX_RETRY_INTERVAL_US: u32 = 500;
/// Slack allowed on top of [`AUX_RETRY_INTERVAL_US`].
pub const AUX_RETRY_SLACK_US: u32 = 100;

/// Blocking sleep primitive supplied by the platform.
pub trait Delay: Send + Sync {
    /// Sleep for at least `min_us` and at most `max_us` microseconds.
    fn sleep_range_us(&self, min_us: u32, max_us: u32);

    /// The standard wait between two AUX attempts.
    fn aux_retry_wait(&self) {
        self.sleep_range_us(
            AUX_RETRY_INTERVAL_US,
            AUX_RETRY_INTERVAL_US + AUX_RETRY_SLACK_US,
        );
    }
}

/// Host implementation backed by `std::thread::sleep`.
///
/// The actual duration is jittered inside the range so that channels woken
/// together do not retry in lockstep.
#[cfg(feature = "std")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

#[cfg(feature = "std")]
impl Delay for ThreadDelay {
    fn sleep_range_us(&self, min_us: u32, max_us: u32) {
        use std::time::{Duration, SystemTime, UNIX_EPOCH};

        let span = max_us.saturating_sub(min_us);
        let jitter = if span == 0 {
            0
        } else {
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.subsec_nanos());
            seed % span.saturating_add(1)
        };
        std::thread::sleep(Duration::from_micros(u64::from(min_us + jitter)));
    }
}
