use acadledger_core::AggregateId;

/// A command targets a specific aggregate.
///
/// Commands represent intent: a request to perform an action. They are
/// transient (not persisted) and are transformed into events (which are).
/// A rejected command is a business-rule violation; an event is an accepted
/// fact.
///
/// Each command operates on exactly one aggregate, which is the transaction
/// boundary: a registration, drop, or ledger append executes as one
/// request-scoped operation against a single stream.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;
}
