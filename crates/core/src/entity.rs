//! Entity marker: identity that survives state changes.

/// An entity is tracked by its identifier, not its current field values.
///
/// A `Course` whose title is corrected is still the same course; two programs
/// with identical fee schedules are still distinct programs.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
