use core::{
    cell::UnsafeCell,
    fmt,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicUsize, Ordering},
};

/// FIFO-fair lock for sections that may run for a long time.
///
/// Waiters are served strictly in arrival order, so a caller that holds the
/// lock across a slow hardware round-trip cannot starve anybody that queued
/// up behind it.
pub struct TicketLock<T> {
    next: AtomicUsize,
    owner: AtomicUsize,
    inner: UnsafeCell<T>,
}

// Safety: only the ticket owner dereferences the cell.
unsafe impl<T: Send> Sync for TicketLock<T> {}
unsafe impl<T: Send> Send for TicketLock<T> {}

impl<T> TicketLock<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            next: AtomicUsize::new(0),
            owner: AtomicUsize::new(0),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Draws a ticket and waits for it to be served.
    #[inline]
    pub fn lock(&self) -> TicketLockGuard<'_, T> {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed);
        while self.owner.load(Ordering::Acquire) != ticket {
            spin_loop();
        }
        TicketLockGuard { lock: self }
    }

    /// Takes the lock only if nobody holds it or waits for it.
    #[inline]
    pub fn try_lock(&self) -> Option<TicketLockGuard<'_, T>> {
        let owner = self.owner.load(Ordering::Relaxed);
        self.next
            .compare_exchange(
                owner,
                owner.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .ok()
            .map(|_| TicketLockGuard { lock: self })
    }

    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Number of callers holding or waiting for the lock.
    #[inline]
    pub fn queue_len(&self) -> usize {
        let next = self.next.load(Ordering::Relaxed);
        let owner = self.owner.load(Ordering::Relaxed);
        next.wrapping_sub(owner)
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.queue_len() != 0
    }

    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<T: Default> Default for TicketLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for TicketLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketLock")
            .field("queue_len", &self.queue_len())
            .finish_non_exhaustive()
    }
}

pub struct TicketLockGuard<'a, T> {
    lock: &'a TicketLock<T>,
}

impl<T> Deref for TicketLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: we are the served ticket.
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for TicketLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: we are the served ticket.
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for TicketLockGuard<'_, T> {
    fn drop(&mut self) {
        // Only the owner writes `owner`, so a plain load/store pair is enough.
        let served = self.lock.owner.load(Ordering::Relaxed);
        self.lock
            .owner
            .store(served.wrapping_add(1), Ordering::Release);
    }
}
