//! # ACPI (Advanced Configuration and Power Interface) Object Access
//!
//! This crate provides the typed view of the ACPI namespace that device
//! drivers consume. It does **not** interpret AML; evaluation is delegated to
//! an [`AcpiNamespace`] implementation and everything returned from it is a
//! plain, owned [`AcpiObject`] tree.
//!
//! ## Overview
//!
//! ```text
//! Platform firmware (DSDT / SSDT)
//!     ↓  AML interpreter
//! AcpiNamespace::evaluate(handle, "_DSD" | "_TMP" | ...)
//!     ↓
//! AcpiObject { Integer | String | Buffer | Package | Reference }
//!     ↓  typed accessors (as_integer, as_package, ...)
//! DeviceProperties  ─ key/value lookup, u32 arrays, references
//! ```
//!
//! ## Key Components
//!
//! ### Object Model ([`AcpiObject`])
//! * **Tagged variants**: every evaluated value carries its [`ObjectKind`]
//! * **Typed accessors**: `as_*` return [`AcpiError::TypeMismatch`] instead
//!   of reinterpreting data of the wrong kind
//! * **References**: namespace nodes are named by opaque [`AcpiHandle`]s
//!
//! ### Device Properties ([`dsd`])
//! * **Shape validation**: the `(UUID buffer, property package)` pair
//! * **Lookup**: first matching key wins, malformed entries are skipped
//! * **Integer arrays**: `count_u32` / `read_u32_array` as used for trip
//!   tables and fan cooling levels
//! * **References**: direct or packaged object references (`cooling-device`)
//!
//! ## Usage Patterns
//!
//! ```rust
//! use kernel_acpi::{AcpiHandle, AcpiNamespace, AcpiObject, StaticNamespace};
//! use kernel_acpi::dsd::{DeviceProperties, DEVICE_PROPERTIES_UUID};
//!
//! let zone = AcpiHandle::new(1);
//! let dsd = AcpiObject::Package(vec![
//!     AcpiObject::Buffer(DEVICE_PROPERTIES_UUID.to_vec()),
//!     AcpiObject::Package(vec![AcpiObject::Package(vec![
//!         "active-trip-temps".into(),
//!         AcpiObject::Package(vec![600u64.into(), 700u64.into()]),
//!     ])]),
//! ]);
//! let ns = StaticNamespace::new().with(zone, "_DSD", dsd);
//!
//! let obj = ns.evaluate(zone, "_DSD").unwrap();
//! let props = DeviceProperties::parse(&obj).unwrap();
//! assert_eq!(props.read_u32_array("active-trip-temps").unwrap(), vec![600, 700]);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod dsd;
mod namespace;
mod object;

pub use namespace::{AcpiNamespace, StaticNamespace};
pub use object::{AcpiHandle, AcpiObject, ObjectKind};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcpiError {
    #[error("object not found")]
    NotFound,
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: ObjectKind,
        found: ObjectKind,
    },
    #[error("integer {0:#x} does not fit the requested width")]
    ValueOutOfRange(u64),
    #[error("expected {expected} elements, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("evaluation failed")]
    Io,
}
