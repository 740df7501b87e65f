//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; two
/// instances with the same values are interchangeable. `Location` is the
/// canonical example here: "shelf A1 in the cold area" has no identity of
/// its own.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
