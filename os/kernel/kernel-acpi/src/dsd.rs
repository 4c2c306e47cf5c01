//! `_DSD` device properties.
//!
//! A `_DSD` object evaluates to
//!
//! ```text
//! Package {
//!     Buffer { <16 byte UUID> },
//!     Package {
//!         Package { "key", <value> },
//!         ...
//!     },
//!     ...
//! }
//! ```
//!
//! Only the first UUID/properties pair is consulted. Values are integers,
//! strings, references or packages of those.

use crate::{AcpiError, AcpiHandle, AcpiObject, ObjectKind};
use alloc::vec::Vec;

/// Device-properties UUID `daffd814-6eba-4d8c-8a91-bc9bbf4aa301` in its
/// mixed-endian buffer encoding.
pub const DEVICE_PROPERTIES_UUID: [u8; 16] = [
    0x14, 0xd8, 0xff, 0xda, 0xba, 0x6e, 0x8c, 0x4d, 0x8a, 0x91, 0xbc, 0x9b, 0xbf, 0x4a, 0xa3, 0x01,
];

/// Borrowed view over the key/value list of a `_DSD` object.
#[derive(Debug, Copy, Clone)]
pub struct DeviceProperties<'a> {
    uuid: &'a [u8],
    properties: &'a [AcpiObject],
}

impl<'a> DeviceProperties<'a> {
    /// Validates the outer `(UUID, properties)` shape.
    ///
    /// # Errors
    /// [`AcpiError::TypeMismatch`] if the object, the UUID or the property
    /// list has the wrong kind; [`AcpiError::LengthMismatch`] if the outer
    /// package has fewer than two elements.
    pub fn parse(dsd: &'a AcpiObject) -> Result<Self, AcpiError> {
        let elements = dsd.as_package()?;
        let [uuid, properties, ..] = elements else {
            return Err(AcpiError::LengthMismatch {
                expected: 2,
                found: elements.len(),
            });
        };

        Ok(Self {
            uuid: uuid.as_buffer()?,
            properties: properties.as_package()?,
        })
    }

    #[must_use]
    pub const fn uuid(&self) -> &'a [u8] {
        self.uuid
    }

    #[must_use]
    pub fn is_device_properties(&self) -> bool {
        self.uuid == DEVICE_PROPERTIES_UUID
    }

    /// Well-formed `(string, value)` pairs in declaration order.
    ///
    /// Entries that are not two-element packages with a string key are
    /// skipped silently.
    pub fn entries(&self) -> impl Iterator<Item = (&'a str, &'a AcpiObject)> + 'a {
        self.properties.iter().filter_map(|entry| match entry {
            AcpiObject::Package(pair) => match pair.as_slice() {
                [AcpiObject::String(key), value] => Some((key.as_str(), value)),
                _ => None,
            },
            _ => None,
        })
    }

    /// Value of the first entry named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a AcpiObject> {
        self.entries().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Object reference stored under `key`.
    ///
    /// The value may be the reference itself or a package whose first
    /// element is the reference (the form used when arguments follow it).
    ///
    /// # Errors
    /// [`AcpiError::NotFound`] if the key is absent, [`AcpiError::TypeMismatch`]
    /// if its value has any other shape.
    pub fn reference(&self, key: &str) -> Result<AcpiHandle, AcpiError> {
        match self.get(key).ok_or(AcpiError::NotFound)? {
            AcpiObject::Reference(handle) => Ok(*handle),
            AcpiObject::Package(elements) => match elements.first() {
                Some(AcpiObject::Reference(handle)) => Ok(*handle),
                Some(other) => Err(AcpiError::TypeMismatch {
                    expected: ObjectKind::Reference,
                    found: other.kind(),
                }),
                None => Err(AcpiError::LengthMismatch {
                    expected: 1,
                    found: 0,
                }),
            },
            other => Err(AcpiError::TypeMismatch {
                expected: ObjectKind::Reference,
                found: other.kind(),
            }),
        }
    }

    /// Number of 32-bit integers stored under `key`.
    ///
    /// A bare integer counts as a one-element array.
    ///
    /// # Errors
    /// [`AcpiError::NotFound`] if absent, [`AcpiError::TypeMismatch`] if any
    /// element is not an integer.
    pub fn count_u32(&self, key: &str) -> Result<usize, AcpiError> {
        Ok(self.u32_elements(key)?.len())
    }

    /// All 32-bit integers stored under `key`.
    ///
    /// # Errors
    /// As [`DeviceProperties::count_u32`], plus
    /// [`AcpiError::ValueOutOfRange`] for integers wider than 32 bits.
    pub fn read_u32_array(&self, key: &str) -> Result<Vec<u32>, AcpiError> {
        self.u32_elements(key)?
            .iter()
            .map(AcpiObject::as_u32)
            .collect()
    }

    /// Like [`DeviceProperties::read_u32_array`], but the array must hold
    /// exactly `len` elements.
    ///
    /// # Errors
    /// [`AcpiError::LengthMismatch`] on a count mismatch.
    pub fn read_u32_array_exact(&self, key: &str, len: usize) -> Result<Vec<u32>, AcpiError> {
        let values = self.read_u32_array(key)?;
        if values.len() != len {
            return Err(AcpiError::LengthMismatch {
                expected: len,
                found: values.len(),
            });
        }
        Ok(values)
    }

    fn u32_elements(&self, key: &str) -> Result<&'a [AcpiObject], AcpiError> {
        let value = self.get(key).ok_or(AcpiError::NotFound)?;
        let elements = match value {
            AcpiObject::Integer(_) => core::slice::from_ref(value),
            AcpiObject::Package(elements) => elements.as_slice(),
            other => {
                return Err(AcpiError::TypeMismatch {
                    expected: ObjectKind::Package,
                    found: other.kind(),
                });
            }
        };

        if let Some(bad) = elements.iter().find(|e| e.kind() != ObjectKind::Integer) {
            return Err(AcpiError::TypeMismatch {
                expected: ObjectKind::Integer,
                found: bad.kind(),
            });
        }
        Ok(elements)
    }
}
