//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**; two instances with the same values are
/// interchangeable. Quantities and units are value objects, items are not
/// (see [`crate::Entity`]).
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// struct Quantity(f64);
///
/// impl ValueObject for Quantity {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
