//! Fan on a PWM line, exposed as a cooling device and a single hwmon
//! `pwm1` channel.
//!
//! Cooling states index the optional `cooling-levels` table, e.g.
//! `[0, 85, 170, 255]` gives states 0..=3. Without the table the fan only
//! has state 0 and is controlled through hwmon alone.

use crate::framework::{CoolingDevice, ThermalFramework, ZoneBinding};
use crate::ThermalError;
use alloc::vec::Vec;
use kernel_acpi::dsd::DeviceProperties;
use kernel_acpi::{AcpiHandle, AcpiNamespace};
use kernel_pwm::{PwmChip, PwmState};
use kernel_sync::TicketLock;
use log::{error, info, warn};

/// Full speed on the hwmon scale.
pub const MAX_PWM: u8 = u8::MAX;

/// Cooling device type reported to the thermal framework.
pub const PWM_FAN_DEVICE_TYPE: &str = "pwm-fan";

/// Attributes of the hwmon `pwm1` channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HwmonAttr {
    /// `pwm1`: 0..=255.
    PwmInput,
    /// `pwm1_enable`: always 1 (manual control).
    PwmEnable,
}

impl HwmonAttr {
    /// sysfs permission bits.
    #[must_use]
    pub const fn mode(self) -> u16 {
        match self {
            Self::PwmInput | Self::PwmEnable => 0o644,
        }
    }
}

#[derive(Debug)]
struct FanState {
    pwm_state: PwmState,
    enabled: bool,
    pwm_value: u8,
    cur_state: usize,
    zone: Option<ZoneBinding>,
}

pub struct PwmFan<P> {
    pwm: P,
    levels: Vec<u8>,
    max_state: usize,
    state: TicketLock<FanState>,
}

/// Reads `cooling-levels` from the `_DSD` of `handle`.
///
/// A missing `_DSD` or key yields an empty table.
///
/// # Errors
/// [`ThermalError::Acpi`] if the property exists but is not an integer
/// array, [`ThermalError::InvalidArgument`] if it is empty.
pub fn read_cooling_levels<N: AcpiNamespace + ?Sized>(
    namespace: &N,
    handle: AcpiHandle,
) -> Result<Vec<u32>, ThermalError> {
    let Ok(dsd) = namespace.evaluate(handle, "_DSD") else {
        info!("pwm-fan {handle}: no cooling levels property found");
        return Ok(Vec::new());
    };
    let props = DeviceProperties::parse(&dsd)?;
    if !props.contains("cooling-levels") {
        info!("pwm-fan {handle}: no cooling levels property found");
        return Ok(Vec::new());
    }

    let levels = props.read_u32_array("cooling-levels").inspect_err(|_| {
        error!("pwm-fan {handle}: property 'cooling-levels' cannot be read");
    })?;
    if levels.is_empty() {
        error!("pwm-fan {handle}: wrong data");
        return Err(ThermalError::InvalidArgument);
    }
    Ok(levels)
}

impl<P: PwmChip> PwmFan<P> {
    /// Takes over `pwm`, spins the fan up to full speed and starts in the
    /// highest cooling state.
    ///
    /// # Errors
    /// * [`ThermalError::InvalidArgument`] if a level exceeds [`MAX_PWM`] or
    ///   the PWM period is too large to scale.
    /// * [`ThermalError::Pwm`] if the initial full-speed setting fails.
    pub fn new(pwm: P, levels: &[u32]) -> Result<Self, ThermalError> {
        let pwm_state = pwm.init_state();
        if pwm_state.period > u64::MAX / u64::from(MAX_PWM) {
            error!("pwm-fan: configured period too big");
            return Err(ThermalError::InvalidArgument);
        }

        let levels = levels
            .iter()
            .enumerate()
            .map(|(i, &level)| {
                u8::try_from(level).map_err(|_| {
                    error!("pwm-fan: state[{i}]: {level} > {MAX_PWM}");
                    ThermalError::InvalidArgument
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let max_state = levels.len().saturating_sub(1);

        let fan = Self {
            pwm,
            levels,
            max_state,
            state: TicketLock::new(FanState {
                pwm_state,
                enabled: false,
                pwm_value: 0,
                cur_state: max_state,
                zone: None,
            }),
        };

        fan.set_pwm(&mut fan.state.lock(), MAX_PWM).inspect_err(|e| {
            error!("pwm-fan: failed to configure PWM: {e}");
        })?;

        info!("pwm-fan: registered as cooling device with {} states", max_state + 1);
        Ok(fan)
    }

    /// [`PwmFan::new`] with the levels of the `_DSD` of `handle`.
    ///
    /// # Errors
    /// As [`read_cooling_levels`] and [`PwmFan::new`].
    pub fn probe<N: AcpiNamespace + ?Sized>(
        pwm: P,
        namespace: &N,
        handle: AcpiHandle,
    ) -> Result<Self, ThermalError> {
        let levels = read_cooling_levels(namespace, handle)?;
        Self::new(pwm, &levels)
    }

    #[must_use]
    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    /// Last value written through [`PwmFan::hwmon_write`] or a state change.
    #[must_use]
    pub fn pwm_value(&self) -> u8 {
        self.state.lock().pwm_value
    }

    #[must_use]
    pub fn zone(&self) -> Option<ZoneBinding> {
        self.state.lock().zone
    }

    fn set_pwm(&self, fan: &mut FanState, value: u8) -> Result<(), ThermalError> {
        if value == 0 {
            self.power_off(fan)?;
        } else {
            let next = PwmState {
                enabled: true,
                ..fan
                    .pwm_state
                    .with_relative_duty(u64::from(value), u64::from(MAX_PWM))
            };
            self.pwm.apply(&next)?;
            fan.pwm_state = next;
            fan.enabled = true;
        }
        fan.pwm_value = value;
        Ok(())
    }

    fn power_off(&self, fan: &mut FanState) -> Result<(), ThermalError> {
        if !fan.enabled {
            return Ok(());
        }

        let next = PwmState {
            enabled: false,
            duty_cycle: 0,
            ..fan.pwm_state
        };
        self.pwm.apply(&next)?;
        fan.pwm_state = next;
        fan.enabled = false;
        Ok(())
    }

    /// Cooling state for a raw PWM value: the highest state whose level does
    /// not exceed it.
    #[must_use]
    pub fn state_for_pwm(&self, value: u8) -> usize {
        (0..self.max_state)
            .find(|&i| value < self.levels[i + 1])
            .unwrap_or(self.max_state)
    }

    #[must_use]
    pub fn hwmon_read(&self, attr: HwmonAttr) -> i64 {
        match attr {
            HwmonAttr::PwmInput => i64::from(self.pwm_value()),
            HwmonAttr::PwmEnable => 1,
        }
    }

    /// # Errors
    /// * [`ThermalError::InvalidArgument`] for `pwm1` outside 0..=255.
    /// * [`ThermalError::NotSupported`] for any `pwm1_enable` other than 1.
    /// * [`ThermalError::Pwm`] if the output cannot be programmed.
    pub fn hwmon_write(&self, attr: HwmonAttr, value: i64) -> Result<(), ThermalError> {
        match attr {
            HwmonAttr::PwmInput => {
                let value = u8::try_from(value).map_err(|_| ThermalError::InvalidArgument)?;
                let mut fan = self.state.lock();
                self.set_pwm(&mut fan, value)?;
                fan.cur_state = self.state_for_pwm(value);
                Ok(())
            }
            HwmonAttr::PwmEnable if value == 1 => Ok(()),
            HwmonAttr::PwmEnable => Err(ThermalError::NotSupported),
        }
    }

    /// # Errors
    /// [`ThermalError::Pwm`] if the output cannot be disabled.
    pub fn suspend(&self) -> Result<(), ThermalError> {
        self.power_off(&mut self.state.lock())
    }

    /// Restores the value the fan ran at before [`PwmFan::suspend`].
    ///
    /// # Errors
    /// [`ThermalError::Pwm`] if the output cannot be programmed.
    pub fn resume(&self) -> Result<(), ThermalError> {
        let mut fan = self.state.lock();
        let value = fan.pwm_value;
        self.set_pwm(&mut fan, value)
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.power_off(&mut self.state.lock()) {
            warn!("pwm-fan: failed to stop fan on shutdown: {e}");
        }
    }

    /// Unbinds from the recorded zone, if any, and stops the fan.
    pub fn remove(&self, framework: &dyn ThermalFramework) {
        let zone = self.state.lock().zone.take();
        match zone {
            Some(binding) => {
                info!("pwm-fan: unbinding from thermal zone {}", binding.zone.0);
                for trip in 0..binding.trips {
                    match framework.unbind_cooling_device(binding.zone, trip, self) {
                        Ok(()) => info!("pwm-fan: unbound from trip {trip}"),
                        Err(e) => warn!("pwm-fan: failed to unbind from trip {trip}: {e}"),
                    }
                }
            }
            None => warn!("pwm-fan: no thermal zone recorded, skipping unbind"),
        }
        self.shutdown();
    }
}

impl<P: PwmChip> CoolingDevice for PwmFan<P> {
    fn device_type(&self) -> &str {
        PWM_FAN_DEVICE_TYPE
    }

    fn get_max_state(&self) -> Result<usize, ThermalError> {
        Ok(self.max_state)
    }

    fn get_cur_state(&self) -> Result<usize, ThermalError> {
        Ok(self.state.lock().cur_state)
    }

    fn set_cur_state(&self, state: usize) -> Result<(), ThermalError> {
        if state > self.max_state {
            return Err(ThermalError::InvalidArgument);
        }

        let mut fan = self.state.lock();
        if state == fan.cur_state {
            return Ok(());
        }

        let level = *self.levels.get(state).ok_or(ThermalError::InvalidArgument)?;
        self.set_pwm(&mut fan, level)
            .inspect_err(|e| error!("pwm-fan: cannot set pwm: {e}"))?;
        fan.cur_state = state;
        Ok(())
    }

    fn attach_zone(&self, binding: ZoneBinding) -> Result<(), ThermalError> {
        self.state.lock().zone = Some(binding);
        Ok(())
    }

    fn detach_zone(&self) -> Result<(), ThermalError> {
        self.state.lock().zone = None;
        Ok(())
    }
}
