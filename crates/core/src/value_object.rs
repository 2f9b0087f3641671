//! Value object marker: compared by value, never by identity.

/// Immutable values whose equality is attribute equality.
///
/// `Money` and `Grade` are value objects: two `Money::from_major(50)` are the
/// same amount. A `Course` is not; it keeps its identity when edited.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
