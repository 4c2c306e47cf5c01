//! # VideoCore mailbox controller
//!
//! The BCM2835 family talks to its VideoCore firmware through a pair of
//! hardware FIFOs. Every word carries a 4-bit channel selector in its low
//! nibble; this crate multiplexes the FIFOs into sixteen logical channels.
//!
//! ```text
//! client ──send──▶ Mail1Write ──▶ VideoCore
//! client ◀─rx_callback── handle_irq ◀── Mail0Read ◀── VideoCore
//! ```
//!
//! Channel 8 is reserved for property transactions and can only be obtained
//! through [`Mailbox::request_firmware_channel`]. The hardware never reports
//! transmit completion; waiters use the per-channel [`Completion`](kernel_sync::Completion)
//! raised by [`Mailbox::handle_irq`] instead.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod controller;
mod message;
pub mod regs;

pub use controller::{IrqReturn, Mailbox, MailboxClient};
pub use message::{ChannelId, MailboxMessage};
pub use regs::{MailboxRegisters, MmioRegisters, Register};

/// Number of logical channels addressable by the 4-bit selector.
pub const MAX_CHANNELS: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    #[error("mailbox controller not started")]
    NotReady,
    #[error("no free mailbox channel")]
    Busy,
    #[error("{0} already bound")]
    AlreadyBound(ChannelId),
    #[error("{0} not bound")]
    NotBound(ChannelId),
    #[error("invalid argument")]
    InvalidArgument,
    #[error("channel index {0} out of range")]
    ChannelOutOfRange(u8),
    #[error("payload address {0:#010x} is not 16-byte aligned")]
    MisalignedPayload(u32),
}
