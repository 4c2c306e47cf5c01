#![allow(dead_code)]

use kernel_acpi::dsd::DEVICE_PROPERTIES_UUID;
use kernel_acpi::{AcpiHandle, AcpiObject};
use kernel_firmware::{FirmwareError, PropertyInterface, PropertyTag};
use kernel_thermal::{CoolingDevice, ThermalError, ThermalFramework, ZoneId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const ZONE: AcpiHandle = AcpiHandle::new(0x10);
pub const FAN: AcpiHandle = AcpiHandle::new(0x20);

pub fn pair(key: &str, value: AcpiObject) -> AcpiObject {
    AcpiObject::Package(vec![key.into(), value])
}

pub fn ints(values: &[u64]) -> AcpiObject {
    AcpiObject::Package(values.iter().copied().map(AcpiObject::from).collect())
}

pub fn dsd(entries: Vec<AcpiObject>) -> AcpiObject {
    AcpiObject::Package(vec![
        AcpiObject::Buffer(DEVICE_PROPERTIES_UUID.to_vec()),
        AcpiObject::Package(entries),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Bind {
        zone: ZoneId,
        trip: usize,
        device: String,
        lower: usize,
        upper: usize,
    },
    Unbind {
        zone: ZoneId,
        trip: usize,
        device: String,
    },
}

/// Thermal core stand-in that records binding calls.
#[derive(Default)]
pub struct RecordingFramework {
    pub events: Mutex<Vec<Event>>,
    pub failing_trips: Mutex<HashSet<usize>>,
}

impl RecordingFramework {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn fail_trip(&self, trip: usize) {
        self.failing_trips.lock().unwrap().insert(trip);
    }

    fn check(&self, trip: usize) -> Result<(), ThermalError> {
        if self.failing_trips.lock().unwrap().contains(&trip) {
            Err(ThermalError::InvalidArgument)
        } else {
            Ok(())
        }
    }
}

impl ThermalFramework for RecordingFramework {
    fn bind_cooling_device(
        &self,
        zone: ZoneId,
        trip: usize,
        cdev: &dyn CoolingDevice,
        lower: usize,
        upper: usize,
    ) -> Result<(), ThermalError> {
        self.check(trip)?;
        self.events.lock().unwrap().push(Event::Bind {
            zone,
            trip,
            device: cdev.device_type().to_owned(),
            lower,
            upper,
        });
        Ok(())
    }

    fn unbind_cooling_device(
        &self,
        zone: ZoneId,
        trip: usize,
        cdev: &dyn CoolingDevice,
    ) -> Result<(), ThermalError> {
        self.check(trip)?;
        self.events.lock().unwrap().push(Event::Unbind {
            zone,
            trip,
            device: cdev.device_type().to_owned(),
        });
        Ok(())
    }
}

/// Firmware stand-in holding the PoE duty register.
#[derive(Default)]
pub struct FakeFirmware {
    pub sets: Mutex<Vec<u32>>,
    pub failing: AtomicBool,
}

impl FakeFirmware {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sets(&self) -> Vec<u32> {
        self.sets.lock().unwrap().clone()
    }

    pub fn last_duty(&self) -> Option<u32> {
        self.sets.lock().unwrap().last().copied()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl PropertyInterface for FakeFirmware {
    fn transact(
        &self,
        tag: PropertyTag,
        _reg: u32,
        value: u32,
        is_get: bool,
    ) -> Result<Option<u32>, FirmwareError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FirmwareError::Timeout);
        }
        if is_get {
            return Ok(Some(self.last_duty().unwrap_or(0)));
        }
        assert_eq!(tag, PropertyTag::SET_POE_HAT_VALUE);
        self.sets.lock().unwrap().push(value);
        Ok(None)
    }
}
