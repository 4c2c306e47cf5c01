//! PWM output of the PoE HAT fan, driven through firmware property calls.
//!
//! The HAT runs at a fixed 12.5 kHz; only the duty can change, and the
//! firmware takes it on a 0..=255 scale.

use crate::{Polarity, PwmCapture, PwmChip, PwmError, PwmState};
use core::time::Duration;
use kernel_firmware::PropertyInterface;
use kernel_sync::TicketLock;
use log::{error, info, warn};

/// The only period the HAT supports (12.5 kHz).
pub const POE_PWM_PERIOD_NS: u64 = 80_000;

/// Firmware duty value for 100 %.
pub const POE_PWM_MAX_DUTY: u8 = u8::MAX;

/// Duty of `state` on the firmware scale.
///
/// Disabled outputs map to 0, a duty of at least one period to 255, and
/// everything else is rounded down.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn scale_duty(state: &PwmState) -> u8 {
    if !state.enabled {
        0
    } else if state.duty_cycle >= POE_PWM_PERIOD_NS {
        POE_PWM_MAX_DUTY
    } else {
        (state.duty_cycle * POE_PWM_MAX_DUTY as u64 / POE_PWM_PERIOD_NS) as u8
    }
}

/// Duty in nanoseconds that a firmware value stands for, rounded down.
#[must_use]
pub const fn unscale_duty(scaled: u8) -> u64 {
    scaled as u64 * POE_PWM_PERIOD_NS / POE_PWM_MAX_DUTY as u64
}

#[derive(Debug)]
struct Record {
    scaled: u8,
    state: PwmState,
}

/// PWM chip backed by the firmware's PoE HAT duty register.
///
/// The firmware value is never read back after probe: the record kept here
/// is authoritative and only changes when a SET went through.
pub struct PoePwm<P> {
    firmware: P,
    record: TicketLock<Record>,
}

impl<P: PropertyInterface> PoePwm<P> {
    /// Brings the device up, mirroring the duty the firmware currently runs.
    ///
    /// A failing read is not fatal; the device then assumes the fan is off.
    pub fn probe(firmware: P) -> Self {
        info!("poe-pwm: probing");

        let scaled = match firmware.get_duty() {
            Ok(value) => u8::try_from(value).unwrap_or(POE_PWM_MAX_DUTY),
            Err(e) => {
                warn!("poe-pwm: failed to get current duty cycle: {e}");
                0
            }
        };

        let state = PwmState {
            period: POE_PWM_PERIOD_NS,
            duty_cycle: unscale_duty(scaled),
            polarity: Polarity::Normal,
            enabled: scaled != 0,
        };

        info!("poe-pwm: initialized at duty {scaled}/{POE_PWM_MAX_DUTY}");
        Self {
            firmware,
            record: TicketLock::new(Record { scaled, state }),
        }
    }

    /// Firmware duty value last written or read at probe.
    #[must_use]
    pub fn scaled_duty(&self) -> u8 {
        self.record.lock().scaled
    }

    /// Turns the fan off, whatever the record says.
    ///
    /// # Errors
    /// The firmware failure; the record is left untouched.
    pub fn remove(&self) -> Result<(), PwmError> {
        info!("poe-pwm: removing");
        let mut record = self.record.lock();
        self.firmware
            .set_duty(0)
            .inspect_err(|e| warn!("poe-pwm: failed to reset duty: {e}"))?;
        record.scaled = 0;
        record.state = PwmState {
            duty_cycle: 0,
            enabled: false,
            ..record.state
        };
        Ok(())
    }
}

impl<P: PropertyInterface> PwmChip for PoePwm<P> {
    fn request(&self) -> Result<(), PwmError> {
        Ok(())
    }

    fn free(&self) {
        if let Err(e) = self.apply(&self.init_state()) {
            error!("poe-pwm: failed to disable output on free: {e}");
        }
    }

    fn apply(&self, state: &PwmState) -> Result<(), PwmError> {
        if state.period != POE_PWM_PERIOD_NS || state.polarity != Polarity::Normal {
            return Err(PwmError::InvalidArgument);
        }

        let scaled = scale_duty(state);
        let mut record = self.record.lock();
        if scaled != record.scaled {
            self.firmware.set_duty(scaled)?;
            record.scaled = scaled;
        }
        record.state = *state;
        Ok(())
    }

    fn get_state(&self) -> PwmState {
        let record = self.record.lock();
        PwmState {
            period: POE_PWM_PERIOD_NS,
            duty_cycle: unscale_duty(record.scaled),
            polarity: Polarity::Normal,
            enabled: record.state.enabled,
        }
    }

    fn capture(&self, _timeout: Duration) -> Result<PwmCapture, PwmError> {
        let record = self.record.lock();
        Ok(PwmCapture {
            period: record.state.period,
            duty_cycle: record.state.duty_cycle,
        })
    }

    fn init_state(&self) -> PwmState {
        PwmState {
            period: POE_PWM_PERIOD_NS,
            duty_cycle: 0,
            polarity: Polarity::Normal,
            enabled: false,
        }
    }
}
