//! ACPI thermal zone whose trips and cooling device come from `_DSD`.
//!
//! The zone node carries:
//!
//! ```text
//! "active-trip-temps"       [t0, t1, ...]    at most MAX_TRIPS
//! "active-trip-hysteresis"  [h0, h1, ...]    optional, defaults to 0
//! "cooling-min-states"      [lo0, lo1, ...]  one per trip
//! "cooling-max-states"      [hi0, hi1, ...]  one per trip
//! "cooling-device"          \_SB.FAN0        or Package { \_SB.FAN0, ... }
//! ```

use crate::fan::PWM_FAN_DEVICE_TYPE;
use crate::framework::{
    CoolingDevice, MAX_TRIPS, ThermalFramework, Trend, Trip, ZoneBinding, ZoneId, trend,
};
use crate::ThermalError;
use alloc::vec::Vec;
use kernel_acpi::dsd::DeviceProperties;
use kernel_acpi::{AcpiError, AcpiHandle, AcpiNamespace};
use log::{error, info};

/// Offset between ACPI's tenths of a Kelvin and tenths of a degree Celsius.
pub const KELVIN_OFFSET_DECI: i64 = 2732;

/// Handle of the cooling device referenced by the `_DSD` of `zone`.
///
/// `None` whenever the zone has no usable `_DSD` or no `cooling-device`
/// entry; the first entry with that key decides, even if its value turns
/// out not to be a reference.
pub fn find_cooling_device<N: AcpiNamespace + ?Sized>(
    namespace: &N,
    zone: AcpiHandle,
) -> Option<AcpiHandle> {
    let dsd = namespace.evaluate(zone, "_DSD").ok()?;
    let props = DeviceProperties::parse(&dsd).ok()?;
    props.reference("cooling-device").ok()
}

/// One ACPI thermal zone.
pub struct AcpiThermalZone<N> {
    namespace: N,
    handle: AcpiHandle,
    id: ZoneId,
    trips: Vec<Trip>,
    min_states: Vec<usize>,
    max_states: Vec<usize>,
    cooling_device: AcpiHandle,
}

impl<N: AcpiNamespace> AcpiThermalZone<N> {
    /// Reads the trip table and locates the cooling device of `handle`.
    ///
    /// # Errors
    /// * [`ThermalError::Acpi`] if `_DSD` or `active-trip-temps` is missing
    ///   or malformed.
    /// * [`ThermalError::TooManyTrips`] above [`MAX_TRIPS`].
    /// * [`ThermalError::InvalidArgument`] if a per-trip array does not
    ///   match the trip count.
    /// * [`ThermalError::NoCoolingDevice`] if no existing cooling device is
    ///   referenced.
    pub fn probe(namespace: N, handle: AcpiHandle, id: ZoneId) -> Result<Self, ThermalError> {
        let dsd = namespace.evaluate(handle, "_DSD")?;
        let props = DeviceProperties::parse(&dsd)?;

        let count = props.count_u32("active-trip-temps")?;
        if count > MAX_TRIPS {
            error!("thermal {handle}: {count} trips, at most {MAX_TRIPS} supported");
            return Err(ThermalError::TooManyTrips(count));
        }

        let read = |key: &str| {
            props.read_u32_array_exact(key, count).map_err(|e| {
                error!("thermal {handle}: failed to read {key}: {e}");
                ThermalError::InvalidArgument
            })
        };
        let temps = read("active-trip-temps")?;
        let min_states = read("cooling-min-states")?;
        let max_states = read("cooling-max-states")?;
        let hysteresis = props
            .read_u32_array_exact("active-trip-hysteresis", count)
            .unwrap_or_else(|_| alloc::vec![0; count]);

        let trips = temps
            .iter()
            .zip(&hysteresis)
            .map(|(&t, &h)| -> Result<Trip, ThermalError> {
                Ok(Trip::active(to_i32(t)?, to_i32(h)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cooling_device = find_cooling_device(&namespace, handle).ok_or_else(|| {
            error!("thermal {handle}: no cooling device referenced");
            ThermalError::NoCoolingDevice
        })?;
        if !namespace.device_exists(cooling_device) {
            error!("thermal {handle}: cooling device {cooling_device} does not exist");
            return Err(ThermalError::NoCoolingDevice);
        }

        for (i, trip) in trips.iter().enumerate() {
            info!(
                "thermal {handle}: trip {i}: temp={} hysteresis={}",
                trip.temperature, trip.hysteresis
            );
        }
        info!("thermal {handle}: registered zone {} with {count} trips", id.0);

        Ok(Self {
            namespace,
            handle,
            id,
            trips,
            min_states: min_states.into_iter().map(widen).collect(),
            max_states: max_states.into_iter().map(widen).collect(),
            cooling_device,
        })
    }

    #[must_use]
    pub const fn id(&self) -> ZoneId {
        self.id
    }

    #[must_use]
    pub const fn handle(&self) -> AcpiHandle {
        self.handle
    }

    #[must_use]
    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    /// `(min, max)` cooling state allowed for trip `index`.
    #[must_use]
    pub fn trip_limits(&self, index: usize) -> Option<(usize, usize)> {
        Some((*self.min_states.get(index)?, *self.max_states.get(index)?))
    }

    #[must_use]
    pub const fn cooling_device(&self) -> AcpiHandle {
        self.cooling_device
    }

    /// Current temperature in millidegrees Celsius.
    ///
    /// # Errors
    /// [`ThermalError::Io`] if `_TMP` cannot be evaluated.
    pub fn get_temp(&self) -> Result<i32, ThermalError> {
        let raw = self
            .namespace
            .evaluate_integer(self.handle, "_TMP")
            .map_err(|_| ThermalError::Io)?;
        let raw = i64::try_from(raw).map_err(|_| ThermalError::Io)?;
        i32::try_from((raw - KELVIN_OFFSET_DECI) * 100).map_err(|_| ThermalError::Io)
    }

    /// Trend of `temperature` relative to trip `index`.
    ///
    /// # Errors
    /// [`ThermalError::InvalidArgument`] for an unknown trip.
    pub fn get_trend(&self, temperature: i32, index: usize) -> Result<Trend, ThermalError> {
        let trip = self.trips.get(index).ok_or(ThermalError::InvalidArgument)?;
        Ok(trend(temperature, trip))
    }

    /// Binds every trip to `cdev` if it is a PWM fan.
    ///
    /// Trips that fail to bind are logged and skipped.
    ///
    /// # Errors
    /// Only if the fan refuses the zone back-reference.
    pub fn bind(
        &self,
        framework: &dyn ThermalFramework,
        cdev: &dyn CoolingDevice,
    ) -> Result<(), ThermalError> {
        if !cdev.device_type().contains(PWM_FAN_DEVICE_TYPE) {
            return Ok(());
        }

        cdev.attach_zone(ZoneBinding {
            zone: self.id,
            trips: self.trips.len(),
        })
        .inspect_err(|_| error!("thermal {}: cooling device context not found", self.handle))?;

        info!("thermal {}: binding cooling device {}", self.handle, cdev.device_type());
        for (i, (&lower, &upper)) in self.min_states.iter().zip(&self.max_states).enumerate() {
            match framework.bind_cooling_device(self.id, i, cdev, lower, upper) {
                Ok(()) => info!("thermal {}: bound trip {i} to cooling device", self.handle),
                Err(e) => error!("thermal {}: failed to bind trip {i}: {e}", self.handle),
            }
        }
        Ok(())
    }

    /// Reverses [`AcpiThermalZone::bind`].
    ///
    /// Trips that fail to unbind are logged and skipped.
    ///
    /// # Errors
    /// Only if the fan refuses to drop the zone back-reference, in which case
    /// no trip is touched.
    pub fn unbind(
        &self,
        framework: &dyn ThermalFramework,
        cdev: &dyn CoolingDevice,
    ) -> Result<(), ThermalError> {
        if !cdev.device_type().contains(PWM_FAN_DEVICE_TYPE) {
            info!(
                "thermal {}: ignoring unmatched cooling device on unbind: {}",
                self.handle,
                cdev.device_type()
            );
            return Ok(());
        }

        cdev.detach_zone()
            .inspect_err(|_| error!("thermal {}: cooling device context not found", self.handle))?;

        info!("thermal {}: unbinding cooling device {}", self.handle, cdev.device_type());
        for i in 0..self.trips.len() {
            match framework.unbind_cooling_device(self.id, i, cdev) {
                Ok(()) => info!("thermal {}: unbound trip {i} from cooling device", self.handle),
                Err(e) => error!("thermal {}: failed to unbind trip {i}: {e}", self.handle),
            }
        }
        Ok(())
    }
}

fn to_i32(value: u32) -> Result<i32, ThermalError> {
    i32::try_from(value).map_err(|_| ThermalError::Acpi(AcpiError::ValueOutOfRange(value.into())))
}

#[allow(clippy::cast_possible_truncation)]
const fn widen(value: u32) -> usize {
    value as usize
}
