//! # Thermal control for the PoE HAT fan
//!
//! ```text
//! AcpiThermalZone ──get_temp / trips──▶ thermal framework (governor)
//!        │ bind / unbind                        │ set_cur_state
//!        ▼                                      ▼
//!  ThermalFramework ◀──────────────────── PwmFan ──apply──▶ PwmChip
//! ```
//!
//! * [`framework`]: trips, trends and the two traits the framework and the
//!   cooling devices implement.
//! * [`zone`]: the `_DSD`-described zone, including the search for its
//!   cooling device.
//! * [`fan`]: the PWM fan cooling device with its hwmon channel.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod fan;
pub mod framework;
pub mod zone;

use kernel_acpi::AcpiError;
use kernel_pwm::PwmError;

pub use fan::{HwmonAttr, PwmFan};
pub use framework::{
    CoolingDevice, MAX_TRIPS, ThermalFramework, Trend, Trip, TripType, ZoneBinding, ZoneId, trend,
};
pub use zone::{AcpiThermalZone, find_cooling_device};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThermalError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("{0} trips exceed the supported maximum")]
    TooManyTrips(usize),
    #[error("temperature query failed")]
    Io,
    #[error("no cooling device")]
    NoCoolingDevice,
    #[error("operation not supported")]
    NotSupported,
    #[error(transparent)]
    Pwm(#[from] PwmError),
    #[error(transparent)]
    Acpi(#[from] AcpiError),
}
