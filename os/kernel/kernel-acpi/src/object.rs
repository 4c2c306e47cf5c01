//! Evaluated ACPI objects.

use crate::AcpiError;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Opaque reference to a node in the ACPI namespace.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AcpiHandle(u64);

impl AcpiHandle {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AcpiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acpi:{:#x}", self.0)
    }
}

/// Discriminant of an [`AcpiObject`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Integer,
    String,
    Buffer,
    Package,
    Reference,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Buffer => "buffer",
            Self::Package => "package",
            Self::Reference => "reference",
        })
    }
}

/// The result of evaluating an ACPI object or method.
///
/// Packages nest arbitrarily; a `_DSD` for example is a package of
/// `(buffer, package)` pairs whose inner package holds `(string, value)`
/// pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcpiObject {
    Integer(u64),
    String(String),
    Buffer(Vec<u8>),
    Package(Vec<AcpiObject>),
    Reference(AcpiHandle),
}

impl AcpiObject {
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Integer(_) => ObjectKind::Integer,
            Self::String(_) => ObjectKind::String,
            Self::Buffer(_) => ObjectKind::Buffer,
            Self::Package(_) => ObjectKind::Package,
            Self::Reference(_) => ObjectKind::Reference,
        }
    }

    const fn mismatch(&self, expected: ObjectKind) -> AcpiError {
        AcpiError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    pub const fn as_integer(&self) -> Result<u64, AcpiError> {
        match self {
            Self::Integer(value) => Ok(*value),
            other => Err(other.mismatch(ObjectKind::Integer)),
        }
    }

    pub fn as_str(&self) -> Result<&str, AcpiError> {
        match self {
            Self::String(value) => Ok(value),
            other => Err(other.mismatch(ObjectKind::String)),
        }
    }

    pub fn as_buffer(&self) -> Result<&[u8], AcpiError> {
        match self {
            Self::Buffer(bytes) => Ok(bytes),
            other => Err(other.mismatch(ObjectKind::Buffer)),
        }
    }

    pub fn as_package(&self) -> Result<&[Self], AcpiError> {
        match self {
            Self::Package(elements) => Ok(elements),
            other => Err(other.mismatch(ObjectKind::Package)),
        }
    }

    pub const fn as_reference(&self) -> Result<AcpiHandle, AcpiError> {
        match self {
            Self::Reference(handle) => Ok(*handle),
            other => Err(other.mismatch(ObjectKind::Reference)),
        }
    }

    /// Integer narrowed to 32 bits, as device properties store them.
    pub fn as_u32(&self) -> Result<u32, AcpiError> {
        let value = self.as_integer()?;
        u32::try_from(value).map_err(|_| AcpiError::ValueOutOfRange(value))
    }
}

impl From<u64> for AcpiObject {
    fn from(value: u64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for AcpiObject {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<AcpiHandle> for AcpiObject {
    fn from(value: AcpiHandle) -> Self {
        Self::Reference(value)
    }
}

impl From<Vec<Self>> for AcpiObject {
    fn from(value: Vec<Self>) -> Self {
        Self::Package(value)
    }
}
