//! # VideoCore firmware property transactions
//!
//! A property transaction hands the firmware a small buffer in coherent
//! memory and waits for it to be rewritten in place:
//!
//! ```text
//! allocate buffer ─▶ encode request ─▶ lock ─▶ send(ch8 | bus address)
//!                                                  │
//!                     check indicator ◀─ wait ◀────┘  (completion, 1 s)
//! ```
//!
//! * [`property`]: the nine-word message layout and tags.
//! * [`dma`]: the coherent-memory seam and the RAII [`CoherentBuffer`].
//! * [`Firmware`]: the engine; one per mailbox, shared by its clients.
//! * [`PropertyInterface`]: what clients depend on, with typed PoE helpers.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod dma;
mod engine;
pub mod property;

use core::time::Duration;
use kernel_mailbox::MailboxError;

pub use dma::{CoherentAllocator, CoherentBuffer, DmaRegion};
pub use engine::{Firmware, PropertyInterface};
pub use property::{PropertyTag, TagStatus};

/// Time the firmware gets to answer one request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FirmwareConfig {
    pub timeout: Duration,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FirmwareError {
    #[error("out of coherent memory")]
    OutOfMemory,
    #[error("timed out waiting for the firmware")]
    Timeout,
    #[error("firmware did not acknowledge tag {tag}")]
    Io { tag: PropertyTag },
    #[error(transparent)]
    Mailbox(#[from] MailboxError),
}
