use crate::Monotonic;
use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

/// One-shot wake-up signal between two execution contexts.
///
/// The producer (typically an interrupt handler) calls [`Completion::complete`];
/// the consumer blocks in [`Completion::wait_timeout`]. Every `complete`
/// satisfies exactly one wait. [`Completion::reinit`] discards signals that
/// were raised for an earlier, already abandoned wait.
///
/// Raising the signal uses `Release` and consuming it uses `Acquire`, so any
/// memory the producer wrote before `complete` is visible to the waiter once
/// the wait returns `true`.
#[derive(Debug, Default)]
pub struct Completion {
    done: AtomicU32,
}

impl Completion {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            done: AtomicU32::new(0),
        }
    }

    /// Raises the signal once.
    #[inline]
    pub fn complete(&self) {
        // Saturate instead of wrapping back to "nothing pending".
        let _ = self
            .done
            .fetch_update(Ordering::Release, Ordering::Relaxed, |n| {
                Some(n.saturating_add(1))
            });
    }

    /// Drops every pending signal.
    #[inline]
    pub fn reinit(&self) {
        self.done.store(0, Ordering::Release);
    }

    /// Whether at least one signal is pending.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire) != 0
    }

    /// Consumes one pending signal without waiting.
    #[inline]
    pub fn try_wait(&self) -> bool {
        self.done
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Waits until a signal is consumed or `timeout` has elapsed on `clock`.
    ///
    /// Returns `false` on timeout. The signal is always checked once more
    /// after the deadline so that a completion racing the deadline is not lost.
    pub fn wait_timeout<C: Monotonic + ?Sized>(&self, clock: &C, timeout: Duration) -> bool {
        let start = clock.now();
        loop {
            if self.try_wait() {
                return true;
            }
            if clock.now().saturating_sub(start) >= timeout {
                return self.try_wait();
            }
            clock.relax();
        }
    }
}
