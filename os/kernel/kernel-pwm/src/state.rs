use crate::PwmError;
use core::time::Duration;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    Normal,
    Inversed,
}

/// Requested or current configuration of one PWM output.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PwmState {
    /// Period in nanoseconds.
    pub period: u64,
    /// Active time per period in nanoseconds.
    pub duty_cycle: u64,
    pub polarity: Polarity,
    pub enabled: bool,
}

impl PwmState {
    /// Same state with the duty set to `numerator / scale` of the period,
    /// rounded up.
    #[must_use]
    pub const fn with_relative_duty(self, numerator: u64, scale: u64) -> Self {
        Self {
            duty_cycle: (numerator * self.period).div_ceil(scale),
            ..self
        }
    }
}

/// Result of a capture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PwmCapture {
    pub period: u64,
    pub duty_cycle: u64,
}

/// A single-output PWM controller.
pub trait PwmChip: Send + Sync {
    /// Prepares the output for a new consumer.
    ///
    /// # Errors
    /// Driver specific.
    fn request(&self) -> Result<(), PwmError>;

    /// Releases the output; the driver leaves it disabled.
    fn free(&self);

    /// Programs `state`.
    ///
    /// # Errors
    /// [`PwmError::InvalidArgument`] for states the hardware cannot produce,
    /// or the failure of the underlying transport.
    fn apply(&self, state: &PwmState) -> Result<(), PwmError>;

    /// State as last programmed.
    fn get_state(&self) -> PwmState;

    /// Measures the output, waiting at most `timeout`.
    ///
    /// # Errors
    /// Driver specific.
    fn capture(&self, timeout: Duration) -> Result<PwmCapture, PwmError>;

    /// Reference state consumers start from: the supported period and
    /// polarity, disabled.
    fn init_state(&self) -> PwmState;
}

impl<T: PwmChip + ?Sized> PwmChip for alloc::sync::Arc<T> {
    fn request(&self) -> Result<(), PwmError> {
        (**self).request()
    }

    fn free(&self) {
        (**self).free();
    }

    fn apply(&self, state: &PwmState) -> Result<(), PwmError> {
        (**self).apply(state)
    }

    fn get_state(&self) -> PwmState {
        (**self).get_state()
    }

    fn capture(&self, timeout: Duration) -> Result<PwmCapture, PwmError> {
        (**self).capture(timeout)
    }

    fn init_state(&self) -> PwmState {
        (**self).init_state()
    }
}
