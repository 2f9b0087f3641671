//! Ledger statement projection.
//!
//! One statement per ledger: the fee total, running paid total, current
//! balance, and every transaction line with its balance snapshot. Snapshots
//! come straight off the events; the projection never recomputes them.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use acadledger_core::{AggregateId, Money, ProgramId, StudentId};
use acadledger_events::EventEnvelope;
use acadledger_finance::{LedgerEvent, LedgerId, TransactionKind};

use crate::projections::ProjectionApplyError;
use crate::read_model::ReadStore;

const AGGREGATE_TYPE: &str = "finance.ledger";

/// One transaction line on a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementLine {
    pub sequence: u64,
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    /// Remaining balance after this line, as snapshotted at append time.
    pub balance_after: Money,
}

/// Read model: a student's ledger statement for one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStatement {
    pub ledger_id: LedgerId,
    pub student_id: StudentId,
    pub program_id: ProgramId,
    pub program_fee_total: Money,
    pub total_paid: Money,
    pub balance: Money,
    pub lines: Vec<StatementLine>,
}

/// Projects ledger events into per-ledger statements.
#[derive(Debug)]
pub struct LedgerStatementProjection<S>
where
    S: ReadStore<LedgerId, LedgerStatement>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> LedgerStatementProjection<S>
where
    S: ReadStore<LedgerId, LedgerStatement>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, ledger_id: LedgerId) -> Option<LedgerStatement> {
        self.store.get(&ledger_id)
    }

    pub fn balance(&self, ledger_id: LedgerId) -> Option<Money> {
        self.get(ledger_id).map(|s| s.balance)
    }

    fn cursor(&self, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn advance_cursor(&self, aggregate_id: AggregateId, sequence_number: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(aggregate_id, sequence_number);
        }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionApplyError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = self.cursor(aggregate_id);

        if seq == 0 {
            return Err(ProjectionApplyError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(ProjectionApplyError::NonMonotonicSequence { last, found: seq });
        }

        let ev: LedgerEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionApplyError::Deserialize(e.to_string()))?;

        match ev {
            LedgerEvent::LedgerOpened(e) => {
                self.store.upsert(
                    e.ledger_id,
                    LedgerStatement {
                        ledger_id: e.ledger_id,
                        student_id: e.student_id,
                        program_id: e.program_id,
                        program_fee_total: e.program_fee_total,
                        total_paid: Money::ZERO,
                        balance: e.program_fee_total,
                        lines: Vec::new(),
                    },
                );
            }
            LedgerEvent::TransactionAppended(e) => {
                if let Some(mut statement) = self.store.get(&e.ledger_id) {
                    statement.total_paid = statement.total_paid + e.kind.signed(e.amount);
                    statement.balance = e.balance_after;
                    statement.lines.push(StatementLine {
                        sequence: e.sequence,
                        kind: e.kind,
                        amount: e.amount,
                        description: e.description,
                        transaction_date: e.transaction_date,
                        balance_after: e.balance_after,
                    });
                    self.store.upsert(e.ledger_id, statement);
                }
            }
        }

        self.advance_cursor(aggregate_id, seq);
        Ok(())
    }

    /// Wipe every statement and rebuild them by replaying the history.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionApplyError> {
        self.store.clear();
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryReadStore;
    use acadledger_finance::{LedgerOpened, TransactionAppended};
    use std::sync::Arc;

    fn envelope(ledger_id: LedgerId, seq: u64, event: LedgerEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            uuid::Uuid::now_v7(),
            ledger_id.0,
            AGGREGATE_TYPE,
            seq,
            serde_json::to_value(&event).unwrap(),
        )
    }

    fn projection() -> LedgerStatementProjection<Arc<InMemoryReadStore<LedgerId, LedgerStatement>>> {
        LedgerStatementProjection::new(Arc::new(InMemoryReadStore::new()))
    }

    fn appended(
        ledger_id: LedgerId,
        sequence: u64,
        kind: TransactionKind,
        amount: i64,
        balance_after: i64,
    ) -> LedgerEvent {
        LedgerEvent::TransactionAppended(TransactionAppended {
            ledger_id,
            sequence,
            kind,
            amount: Money::from_major(amount),
            description: "entry".to_string(),
            transaction_date: Utc::now(),
            balance_after: Money::from_major(balance_after),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn statement_tracks_lines_and_balance() {
        let proj = projection();
        let ledger_id = LedgerId::new(AggregateId::new());

        proj.apply_envelope(&envelope(
            ledger_id,
            1,
            LedgerEvent::LedgerOpened(LedgerOpened {
                ledger_id,
                student_id: StudentId::new(),
                program_id: ProgramId::new(),
                program_fee_total: Money::from_major(2250),
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();

        proj.apply_envelope(&envelope(
            ledger_id,
            2,
            appended(ledger_id, 1, TransactionKind::Payment, 500, 1750),
        ))
        .unwrap();
        proj.apply_envelope(&envelope(
            ledger_id,
            3,
            appended(ledger_id, 2, TransactionKind::Fee, 200, 1950),
        ))
        .unwrap();

        let statement = proj.get(ledger_id).unwrap();
        assert_eq!(statement.balance, Money::from_major(1950));
        assert_eq!(statement.total_paid, Money::from_major(300));
        assert_eq!(statement.lines.len(), 2);
        assert_eq!(statement.lines[0].balance_after, Money::from_major(1750));
    }

    #[test]
    fn replayed_line_is_absorbed() {
        let proj = projection();
        let ledger_id = LedgerId::new(AggregateId::new());

        proj.apply_envelope(&envelope(
            ledger_id,
            1,
            LedgerEvent::LedgerOpened(LedgerOpened {
                ledger_id,
                student_id: StudentId::new(),
                program_id: ProgramId::new(),
                program_fee_total: Money::from_major(100),
                occurred_at: Utc::now(),
            }),
        ))
        .unwrap();

        let line = envelope(ledger_id, 2, appended(ledger_id, 1, TransactionKind::Payment, 40, 60));
        proj.apply_envelope(&line).unwrap();
        proj.apply_envelope(&line).unwrap();

        let statement = proj.get(ledger_id).unwrap();
        assert_eq!(statement.lines.len(), 1);
        assert_eq!(statement.total_paid, Money::from_major(40));
    }
}
