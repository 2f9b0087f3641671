//! Read-model projections built from published event envelopes.
//!
//! Each projection keeps a per-stream cursor and applies envelopes
//! idempotently: a sequence number at or below the cursor is skipped, a gap
//! is an error. `rebuild_from_scratch` clears the read model and replays.

use thiserror::Error;

pub mod ledger_balances;
pub mod seat_counts;
pub mod transcript;

pub use ledger_balances::{LedgerStatement, LedgerStatementProjection, StatementLine};
pub use seat_counts::{OfferingSeats, OfferingSeatsProjection};
pub use transcript::{StudentTranscriptProjection, TranscriptEntry};

#[derive(Debug, Error)]
pub enum ProjectionApplyError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}
