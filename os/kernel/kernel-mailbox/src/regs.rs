//! Mailbox register block.
//!
//! Only mailboxes 0 and 1 are used: the VideoCore delivers to us in
//! mailbox 0, we deliver to it in mailbox 1.

use bitfield_struct::bitfield;
use core::ptr::NonNull;
use core::sync::atomic::{Ordering, fence};

const ARM_0_MAIL0: usize = 0x00;
const ARM_0_MAIL1: usize = 0x20;

/// 32-bit registers of the mailbox peripheral, by byte offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(usize)]
pub enum Register {
    /// Mailbox 0 read (pops the inbound FIFO).
    Mail0Read = ARM_0_MAIL0,
    /// Mailbox 0 peek.
    Mail0Poll = ARM_0_MAIL0 + 0x10,
    Mail0Status = ARM_0_MAIL0 + 0x18,
    Mail0Config = ARM_0_MAIL0 + 0x1C,
    /// Mailbox 1 write (pushes the outbound FIFO).
    Mail1Write = ARM_0_MAIL1,
    Mail1Status = ARM_0_MAIL1 + 0x18,
}

impl Register {
    #[must_use]
    pub const fn offset(self) -> usize {
        self as usize
    }
}

/// Mailbox status register.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct MailboxStatus {
    /// Bits 0–29: FIFO fill level, unused here.
    #[bits(30)]
    pub level: u32,
    /// Bit 30: FIFO is empty (nothing to read).
    pub empty: bool,
    /// Bit 31: FIFO is full (writes would be lost).
    pub full: bool,
}

/// Mailbox configuration register.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct MailboxConfig {
    /// Bit 0: raise an interrupt while the inbound FIFO holds data.
    pub data_irq_enable: bool,
    #[bits(31)]
    __reserved: u32,
}

/// Raw access to the register block.
///
/// Both operations take `&mut self`: reading [`Register::Mail0Read`] consumes
/// a FIFO entry, so neither is free of side effects.
pub trait MailboxRegisters: Send {
    fn read(&mut self, reg: Register) -> u32;
    fn write(&mut self, reg: Register, value: u32);
}

/// Register block mapped into the address space.
#[derive(Debug)]
pub struct MmioRegisters {
    base: NonNull<u8>,
}

// SAFETY: the mapping is device memory owned by the controller; access is
// serialized by the controller's register lock.
unsafe impl Send for MmioRegisters {}

impl MmioRegisters {
    /// # Safety
    /// `base` must point to the mapped mailbox block (at least `0x3C` bytes
    /// of device memory) for the lifetime of the returned value.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u8>) -> Self {
        Self { base }
    }

    fn reg(&self, reg: Register) -> NonNull<u32> {
        // SAFETY: every offset lies inside the block guaranteed by `new`.
        unsafe { self.base.byte_add(reg.offset()).cast::<u32>() }
    }
}

impl MailboxRegisters for MmioRegisters {
    fn read(&mut self, reg: Register) -> u32 {
        // SAFETY: aligned, mapped device register.
        let value = unsafe { self.reg(reg).read_volatile() };
        fence(Ordering::Acquire);
        value
    }

    fn write(&mut self, reg: Register, value: u32) {
        fence(Ordering::Release);
        // SAFETY: aligned, mapped device register.
        unsafe { self.reg(reg).write_volatile(value) };
    }
}
