//! The aggregate contract shared by offerings, ledgers, and enrollments.

use crate::error::{DomainError, DomainResult};

/// Identity and stream position of an event-sourced aggregate.
///
/// The version equals the number of events applied so far, which is also the
/// stream revision the store checks on append.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Count of events applied; bumps by one per `apply`.
    fn version(&self) -> u64;
}

/// What stream revision a writer expects to find on append.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No check. Used by replays and idempotent maintenance commands.
    Any,
    /// The stream must sit at exactly this revision.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            return Ok(());
        }
        Err(DomainError::conflict(format!(
            "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
        )))
    }
}

/// Pure decision/evolution split for an event-sourced aggregate.
///
/// `handle` decides: given current state and a command, either reject with a
/// domain error or return the events that record the decision. `apply` evolves:
/// fold one event into state. Neither performs IO; a registration decision
/// looks the same on live traffic and on replay.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Fold one event into state, bumping `version()` by one.
    fn apply(&mut self, event: &Self::Event);

    /// Decide on a command without mutating state.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
