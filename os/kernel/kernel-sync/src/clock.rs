//! Monotonic time sources for bounded waits.

use core::hint::spin_loop;
use core::time::Duration;

/// A monotonic clock.
///
/// Waiters only ever compare two readings of the same clock, so the epoch is
/// irrelevant; it just must never go backwards.
pub trait Monotonic {
    /// Time elapsed since an arbitrary, fixed epoch.
    fn now(&self) -> Duration;

    /// Called between two polls of a busy wait.
    #[inline]
    fn relax(&self) {
        spin_loop();
    }
}

impl<C: Monotonic + ?Sized> Monotonic for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn relax(&self) {
        (**self).relax();
    }
}

/// [`Monotonic`] backed by [`std::time::Instant`], for hosted builds and tests.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    epoch: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Monotonic for StdClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn relax(&self) {
        std::thread::yield_now();
    }
}
