//! Command execution pipeline.
//!
//! One consistent lifecycle for every event-sourced aggregate: load history,
//! rehydrate, handle the command, append with an optimistic concurrency
//! check, publish to the bus. The dispatcher composes the `EventStore` and
//! `EventBus` traits and performs no IO of its own.
//!
//! Publication happens after a successful append. If publication fails the
//! events are already persisted, so delivery is at-least-once and consumers
//! must be idempotent.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use acadledger_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use acadledger_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency failure (stale aggregate version).
    Concurrency(String),
    /// Deterministic business rejection from the aggregate.
    Domain(DomainError),
    /// A historical payload no longer matches the aggregate's event type.
    Deserialize(String),
    /// The store refused or failed the append.
    Store(EventStoreError),
    /// The append succeeded but the bus did not take the envelope; a retry
    /// redelivers, which cursors absorb.
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        DispatchError::Domain(value)
    }
}

/// Runs commands against event-sourced aggregates, one lifecycle for all.
///
/// Generic over the store and bus so tests run on the in-memory pair and a
/// persistent backend can be swapped in without touching domain code.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run one command end to end: load, rehydrate, decide, append, publish.
    ///
    /// The `make_aggregate` closure builds a fresh instance for rehydration
    /// (e.g. `CourseOffering::empty(id)`), keeping the dispatcher ignorant of
    /// aggregate construction.
    ///
    /// Returns the committed `StoredEvent`s with their assigned sequence
    /// numbers. The expected version is taken from the loaded stream, so a
    /// concurrent writer causes `DispatchError::Concurrency`; callers retry
    /// by re-executing the command.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: acadledger_events::Event + Serialize + DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // Pure decision; state only moves through apply on replay.
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(aggregate_id, aggregate_type.clone(), Uuid::now_v7(), ev)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        // Only appended events reach the bus.
        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // The stream must belong to the requested aggregate and be monotonically
    // increasing by sequence number, even if a buggy backend says otherwise.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Replay in explicit sequence order.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::InMemoryEventStore;
    use acadledger_events::InMemoryEventBus;
    use acadledger_finance::{
        AppendTransaction, LedgerCommand, LedgerId, OpenLedger, StudentLedger, TransactionKind,
    };
    use acadledger_core::{Money, ProgramId, StudentId};
    use chrono::Utc;

    fn dispatcher() -> CommandDispatcher<InMemoryEventStore, InMemoryEventBus<EventEnvelope<JsonValue>>>
    {
        CommandDispatcher::new(InMemoryEventStore::new(), InMemoryEventBus::new())
    }

    #[test]
    fn dispatch_persists_and_rehydrates_across_commands() {
        let dispatcher = dispatcher();
        let ledger_id = LedgerId::new(AggregateId::new());

        let opened = dispatcher
            .dispatch::<StudentLedger>(
                ledger_id.0,
                "finance.ledger",
                LedgerCommand::OpenLedger(OpenLedger {
                    ledger_id,
                    student_id: StudentId::new(),
                    program_id: ProgramId::new(),
                    program_fee_total: Money::from_major(2250),
                    occurred_at: Utc::now(),
                }),
                |id| StudentLedger::empty(LedgerId::new(id)),
            )
            .unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].sequence_number, 1);

        // The second command sees the rehydrated state of the first.
        let appended = dispatcher
            .dispatch::<StudentLedger>(
                ledger_id.0,
                "finance.ledger",
                LedgerCommand::AppendTransaction(AppendTransaction {
                    ledger_id,
                    kind: TransactionKind::Payment,
                    amount: Money::from_major(500),
                    description: "first installment".to_string(),
                    transaction_date: Utc::now(),
                    occurred_at: Utc::now(),
                }),
                |id| StudentLedger::empty(LedgerId::new(id)),
            )
            .unwrap();
        assert_eq!(appended[0].sequence_number, 2);
    }

    #[test]
    fn domain_rejection_surfaces_as_domain_error() {
        let dispatcher = dispatcher();
        let ledger_id = LedgerId::new(AggregateId::new());

        // Appending to a never-opened ledger is a domain-level not-found.
        let err = dispatcher
            .dispatch::<StudentLedger>(
                ledger_id.0,
                "finance.ledger",
                LedgerCommand::AppendTransaction(AppendTransaction {
                    ledger_id,
                    kind: TransactionKind::Fee,
                    amount: Money::from_major(10),
                    description: "late fee".to_string(),
                    transaction_date: Utc::now(),
                    occurred_at: Utc::now(),
                }),
                |id| StudentLedger::empty(LedgerId::new(id)),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::NotFound)));
    }
}
