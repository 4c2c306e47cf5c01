//! # PWM outputs
//!
//! The generic [`PwmChip`] abstraction consumed by fan drivers, and
//! [`PoePwm`], the PoE HAT output that forwards duty changes to the
//! VideoCore firmware instead of programming a local timer.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod poe;
mod state;

use kernel_firmware::FirmwareError;

pub use poe::{POE_PWM_MAX_DUTY, POE_PWM_PERIOD_NS, PoePwm};
pub use state::{Polarity, PwmCapture, PwmChip, PwmState};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PwmError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error(transparent)]
    Firmware(#[from] FirmwareError),
}
