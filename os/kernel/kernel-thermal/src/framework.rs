//! Interfaces between thermal zones, cooling devices and the governor side
//! of the thermal framework.

use crate::ThermalError;

/// Most trips a zone can carry.
pub const MAX_TRIPS: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TripType {
    /// Engage a cooling device.
    Active,
    /// Throttle the heat source.
    Passive,
    Hot,
    Critical,
}

/// One temperature threshold of a zone.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Trip {
    pub trip_type: TripType,
    pub temperature: i32,
    pub hysteresis: i32,
}

impl Trip {
    #[must_use]
    pub const fn active(temperature: i32, hysteresis: i32) -> Self {
        Self {
            trip_type: TripType::Active,
            temperature,
            hysteresis,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trend {
    Stable,
    Raising,
    Dropping,
}

/// Classifies `temperature` against `trip`.
///
/// Below the hysteresis band the zone is cooling down, at or above the
/// threshold it is heating up, in between it is stable.
#[must_use]
pub const fn trend(temperature: i32, trip: &Trip) -> Trend {
    if temperature < trip.temperature - trip.hysteresis {
        Trend::Dropping
    } else if temperature >= trip.temperature {
        Trend::Raising
    } else {
        Trend::Stable
    }
}

/// Identity of a registered thermal zone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoneId(pub u32);

/// Back-reference a cooling device keeps to the zone it is bound to, so
/// that it can unbind itself on teardown.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ZoneBinding {
    pub zone: ZoneId,
    pub trips: usize,
}

/// A device the thermal framework can throttle in discrete states.
pub trait CoolingDevice: Send + Sync {
    /// Type string zones match on, e.g. `"pwm-fan"`.
    fn device_type(&self) -> &str;

    /// # Errors
    /// Driver specific.
    fn get_max_state(&self) -> Result<usize, ThermalError>;

    /// # Errors
    /// Driver specific.
    fn get_cur_state(&self) -> Result<usize, ThermalError>;

    /// # Errors
    /// [`ThermalError::InvalidArgument`] above the maximum state, or the
    /// failure of the underlying hardware.
    fn set_cur_state(&self, state: usize) -> Result<(), ThermalError>;

    /// Records the zone this device was bound to.
    ///
    /// # Errors
    /// [`ThermalError::InvalidArgument`] for devices that keep no zone
    /// reference.
    fn attach_zone(&self, _binding: ZoneBinding) -> Result<(), ThermalError> {
        Err(ThermalError::InvalidArgument)
    }

    /// Forgets the zone recorded by [`CoolingDevice::attach_zone`].
    ///
    /// # Errors
    /// As [`CoolingDevice::attach_zone`].
    fn detach_zone(&self) -> Result<(), ThermalError> {
        Err(ThermalError::InvalidArgument)
    }
}

/// Trip-level binding operations of the thermal core.
pub trait ThermalFramework: Send + Sync {
    /// Lets `trip` of `zone` drive `cdev` between `lower` and `upper`.
    ///
    /// # Errors
    /// Framework specific.
    fn bind_cooling_device(
        &self,
        zone: ZoneId,
        trip: usize,
        cdev: &dyn CoolingDevice,
        lower: usize,
        upper: usize,
    ) -> Result<(), ThermalError>;

    /// # Errors
    /// Framework specific.
    fn unbind_cooling_device(
        &self,
        zone: ZoneId,
        trip: usize,
        cdev: &dyn CoolingDevice,
    ) -> Result<(), ThermalError>;
}
