//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Line items, payments, currency codes and computed totals are value
/// objects: they carry no identity and are compared attribute by attribute.
/// Monetary amounts are `f64`, so implementors only get `PartialEq`.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
