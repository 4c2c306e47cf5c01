//! # Kernel synchronization primitives
//!
//! * [`SpinLock`]: short critical sections (register pairs, table slots).
//! * [`TicketLock`]: FIFO-fair lock that may be held across slow hardware
//!   round-trips.
//! * [`Completion`]: one-shot signal from an interrupt path to a waiter,
//!   bounded by a [`Monotonic`] clock.

#![cfg_attr(not(any(test, doctest, feature = "std")), no_std)]
#![allow(unsafe_code)]

mod clock;
mod completion;
mod spin_lock;
mod ticket_lock;

#[cfg(feature = "std")]
pub use clock::StdClock;
pub use clock::Monotonic;
pub use completion::Completion;
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use ticket_lock::{TicketLock, TicketLockGuard};
