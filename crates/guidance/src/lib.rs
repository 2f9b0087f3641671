//! `acadledger-guidance`
//!
//! **Responsibility:** Optional AI student-support boundary.
//!
//! Deliberately outside the ledger core: it never touches the academic
//! aggregates and never writes domain state. It reshapes model text into
//! suggestion records, nothing more.

pub mod service;
pub mod suggestion;

pub use service::{GuidanceError, GuidanceModel, GuidanceService};
pub use suggestion::Suggestion;
