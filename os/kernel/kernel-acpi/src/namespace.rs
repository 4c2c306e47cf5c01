//! Evaluation of namespace objects.

use crate::{AcpiError, AcpiHandle, AcpiObject};
use alloc::collections::BTreeMap;
use alloc::string::String;

/// Evaluates objects and control methods below a namespace node.
///
/// This is the boundary to the AML interpreter. Everything above it only
/// ever sees fully evaluated [`AcpiObject`] trees.
pub trait AcpiNamespace: Send + Sync {
    /// Evaluates `method` (e.g. `"_DSD"`, `"_TMP"`) relative to `handle`.
    ///
    /// # Errors
    /// [`AcpiError::NotFound`] if there is no such object, [`AcpiError::Io`]
    /// if evaluation itself failed.
    fn evaluate(&self, handle: AcpiHandle, method: &str) -> Result<AcpiObject, AcpiError>;

    /// Whether `handle` names a device node.
    fn device_exists(&self, handle: AcpiHandle) -> bool;

    /// Evaluates `method` and requires an integer result.
    ///
    /// # Errors
    /// As [`AcpiNamespace::evaluate`], plus [`AcpiError::TypeMismatch`].
    fn evaluate_integer(&self, handle: AcpiHandle, method: &str) -> Result<u64, AcpiError> {
        self.evaluate(handle, method)?.as_integer()
    }
}

impl<N: AcpiNamespace + ?Sized> AcpiNamespace for &N {
    fn evaluate(&self, handle: AcpiHandle, method: &str) -> Result<AcpiObject, AcpiError> {
        (**self).evaluate(handle, method)
    }

    fn device_exists(&self, handle: AcpiHandle) -> bool {
        (**self).device_exists(handle)
    }
}

impl<N: AcpiNamespace + ?Sized> AcpiNamespace for alloc::sync::Arc<N> {
    fn evaluate(&self, handle: AcpiHandle, method: &str) -> Result<AcpiObject, AcpiError> {
        (**self).evaluate(handle, method)
    }

    fn device_exists(&self, handle: AcpiHandle) -> bool {
        (**self).device_exists(handle)
    }
}

/// A namespace of pre-evaluated, constant objects.
///
/// Covers platforms whose relevant devices only carry static data (`_HID`,
/// `_DSD`, constant `_TMP` stubs) and hosted simulation.
#[derive(Debug, Default, Clone)]
pub struct StaticNamespace {
    objects: BTreeMap<(AcpiHandle, String), AcpiObject>,
}

impl StaticNamespace {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }

    /// Declares (or replaces) the value of `method` below `handle`.
    pub fn insert(&mut self, handle: AcpiHandle, method: &str, value: AcpiObject) {
        self.objects.insert((handle, method.into()), value);
    }

    #[must_use]
    pub fn with(mut self, handle: AcpiHandle, method: &str, value: AcpiObject) -> Self {
        self.insert(handle, method, value);
        self
    }

    /// Removes an object; evaluating it afterwards fails with `NotFound`.
    pub fn remove(&mut self, handle: AcpiHandle, method: &str) -> Option<AcpiObject> {
        self.objects.remove(&(handle, String::from(method)))
    }
}

impl AcpiNamespace for StaticNamespace {
    fn evaluate(&self, handle: AcpiHandle, method: &str) -> Result<AcpiObject, AcpiError> {
        self.objects
            .get(&(handle, String::from(method)))
            .cloned()
            .ok_or(AcpiError::NotFound)
    }

    fn device_exists(&self, handle: AcpiHandle) -> bool {
        self.objects.keys().any(|(h, _)| *h == handle)
    }
}
