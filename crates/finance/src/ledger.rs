use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use acadledger_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, Money, ProgramId, StudentId,
};
use acadledger_events::{Command, Event};

/// Student ledger identifier (aggregate id). One ledger per (student, program).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerId(pub AggregateId);

impl LedgerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LedgerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Ledger transaction kind.
///
/// Sign convention: `Payment`/`Refund` add to the amount paid;
/// `Fee`/`Adjustment` subtract from it (raising the remaining balance owed).
/// There is no reversal kind — corrections are new `Adjustment` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Fee,
    Payment,
    Refund,
    Adjustment,
}

impl TransactionKind {
    /// Signed contribution of an `amount` to the running paid total.
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            TransactionKind::Payment | TransactionKind::Refund => amount,
            TransactionKind::Fee | TransactionKind::Adjustment => -amount,
        }
    }
}

/// Aggregate root: StudentLedger.
///
/// Holds the running paid total so an append computes its balance snapshot
/// without rereading history; rehydration replays `TransactionAppended` in
/// explicit sequence order and reaches the same totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentLedger {
    id: LedgerId,
    student_id: Option<StudentId>,
    program_id: Option<ProgramId>,
    /// Total program fee captured when the ledger is opened.
    program_fee_total: Money,
    total_paid: Money,
    /// Explicit monotonic sequence stamped on each appended transaction.
    next_sequence: u64,
    version: u64,
    created: bool,
}

impl StudentLedger {
    /// Create an empty, not-yet-opened aggregate instance for rehydration.
    pub fn empty(id: LedgerId) -> Self {
        Self {
            id,
            student_id: None,
            program_id: None,
            program_fee_total: Money::ZERO,
            total_paid: Money::ZERO,
            next_sequence: 1,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> LedgerId {
        self.id
    }

    pub fn student_id(&self) -> Option<StudentId> {
        self.student_id
    }

    pub fn program_id(&self) -> Option<ProgramId> {
        self.program_id
    }

    pub fn program_fee_total(&self) -> Money {
        self.program_fee_total
    }

    pub fn total_paid(&self) -> Money {
        self.total_paid
    }

    /// Remaining balance owed: `program_fee_total − total_paid`.
    pub fn balance(&self) -> Money {
        self.program_fee_total - self.total_paid
    }
}

impl AggregateRoot for StudentLedger {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenLedger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLedger {
    pub ledger_id: LedgerId,
    pub student_id: StudentId,
    pub program_id: ProgramId,
    /// `total_program_fee` of the program at enrollment time.
    pub program_fee_total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AppendTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendTransaction {
    pub ledger_id: LedgerId,
    pub kind: TransactionKind,
    /// Positive magnitude; the kind determines the sign.
    pub amount: Money,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    OpenLedger(OpenLedger),
    AppendTransaction(AppendTransaction),
}

impl Command for LedgerCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            LedgerCommand::OpenLedger(c) => c.ledger_id.0,
            LedgerCommand::AppendTransaction(c) => c.ledger_id.0,
        }
    }
}

/// Event: LedgerOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOpened {
    pub ledger_id: LedgerId,
    pub student_id: StudentId,
    pub program_id: ProgramId,
    pub program_fee_total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionAppended (immutable once emitted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAppended {
    pub ledger_id: LedgerId,
    /// Position in this ledger's history; replay order is defined by this,
    /// not by storage insertion order.
    pub sequence: u64,
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    /// Remaining balance after this transaction, including its own amount.
    pub balance_after: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    LedgerOpened(LedgerOpened),
    TransactionAppended(TransactionAppended),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::LedgerOpened(_) => "finance.ledger.opened",
            LedgerEvent::TransactionAppended(_) => "finance.ledger.transaction_appended",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::LedgerOpened(e) => e.occurred_at,
            LedgerEvent::TransactionAppended(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StudentLedger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::LedgerOpened(e) => {
                self.id = e.ledger_id;
                self.student_id = Some(e.student_id);
                self.program_id = Some(e.program_id);
                self.program_fee_total = e.program_fee_total;
                self.total_paid = Money::ZERO;
                self.next_sequence = 1;
                self.created = true;
            }
            LedgerEvent::TransactionAppended(e) => {
                self.total_paid = self.total_paid + e.kind.signed(e.amount);
                self.next_sequence = e.sequence + 1;
            }
        }

        // One version step per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::OpenLedger(cmd) => self.handle_open(cmd),
            LedgerCommand::AppendTransaction(cmd) => self.handle_append(cmd),
        }
    }
}

impl StudentLedger {
    fn ensure_ledger_id(&self, ledger_id: LedgerId) -> Result<(), DomainError> {
        if self.id != ledger_id {
            return Err(DomainError::invariant("ledger_id mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenLedger) -> Result<Vec<LedgerEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("ledger already opened"));
        }
        if cmd.program_fee_total.is_negative() {
            return Err(DomainError::validation("program fee total cannot be negative"));
        }

        Ok(vec![LedgerEvent::LedgerOpened(LedgerOpened {
            ledger_id: cmd.ledger_id,
            student_id: cmd.student_id,
            program_id: cmd.program_id,
            program_fee_total: cmd.program_fee_total,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_append(&self, cmd: &AppendTransaction) -> Result<Vec<LedgerEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_ledger_id(cmd.ledger_id)?;

        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("amount must be positive"));
        }
        if cmd.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }

        // The new transaction's own signed amount counts before the snapshot.
        let paid_after = self.total_paid + cmd.kind.signed(cmd.amount);
        let balance_after = self.program_fee_total - paid_after;

        Ok(vec![LedgerEvent::TransactionAppended(TransactionAppended {
            ledger_id: cmd.ledger_id,
            sequence: self.next_sequence,
            kind: cmd.kind,
            amount: cmd.amount,
            description: cmd.description.clone(),
            transaction_date: cmd.transaction_date,
            balance_after,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn opened(fee_total: Money) -> StudentLedger {
        let id = LedgerId::new(AggregateId::new());
        let mut ledger = StudentLedger::empty(id);
        let events = ledger
            .handle(&LedgerCommand::OpenLedger(OpenLedger {
                ledger_id: id,
                student_id: StudentId::new(),
                program_id: ProgramId::new(),
                program_fee_total: fee_total,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            ledger.apply(e);
        }
        ledger
    }

    fn append(
        ledger: &mut StudentLedger,
        kind: TransactionKind,
        amount: Money,
    ) -> Result<TransactionAppended, DomainError> {
        let events = ledger.handle(&LedgerCommand::AppendTransaction(AppendTransaction {
            ledger_id: ledger.id_typed(),
            kind,
            amount,
            description: "test transaction".to_string(),
            transaction_date: Utc::now(),
            occurred_at: Utc::now(),
        }))?;
        let appended = match &events[0] {
            LedgerEvent::TransactionAppended(e) => e.clone(),
            other => panic!("unexpected event: {other:?}"),
        };
        for e in &events {
            ledger.apply(e);
        }
        Ok(appended)
    }

    #[test]
    fn payment_then_fee_snapshots_the_running_balance() {
        // tuition=1000, exam=100, other=0, registration=50, duration=2
        // -> total_program_fee = 2250
        let mut ledger = opened(Money::from_major(2250));

        let first = append(&mut ledger, TransactionKind::Payment, Money::from_major(500)).unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.balance_after, Money::from_major(1750));

        let second = append(&mut ledger, TransactionKind::Fee, Money::from_major(200)).unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.balance_after, Money::from_major(1950));

        assert_eq!(ledger.balance(), Money::from_major(1950));
    }

    #[test]
    fn refund_adds_to_paid_and_adjustment_subtracts() {
        let mut ledger = opened(Money::from_major(1000));

        append(&mut ledger, TransactionKind::Payment, Money::from_major(400)).unwrap();
        let refunded = append(&mut ledger, TransactionKind::Refund, Money::from_major(100)).unwrap();
        assert_eq!(refunded.balance_after, Money::from_major(500));

        let adjusted =
            append(&mut ledger, TransactionKind::Adjustment, Money::from_major(50)).unwrap();
        assert_eq!(adjusted.balance_after, Money::from_major(550));
    }

    #[test]
    fn overpayment_drives_the_balance_negative() {
        let mut ledger = opened(Money::from_major(100));

        let appended =
            append(&mut ledger, TransactionKind::Payment, Money::from_major(150)).unwrap();
        assert_eq!(appended.balance_after, Money::from_major(-50));
        assert!(ledger.balance().is_negative());
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut ledger = opened(Money::from_major(100));

        let err = append(&mut ledger, TransactionKind::Payment, Money::ZERO).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = append(&mut ledger, TransactionKind::Fee, Money::from_cents(-100)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn append_on_unopened_ledger_is_not_found() {
        let mut ledger = StudentLedger::empty(LedgerId::new(AggregateId::new()));
        let err = append(&mut ledger, TransactionKind::Fee, Money::from_major(10)).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn rehydration_replays_to_the_same_balance() {
        let id = LedgerId::new(AggregateId::new());
        let mut ledger = StudentLedger::empty(id);
        let mut history = Vec::new();

        let open = ledger
            .handle(&LedgerCommand::OpenLedger(OpenLedger {
                ledger_id: id,
                student_id: StudentId::new(),
                program_id: ProgramId::new(),
                program_fee_total: Money::from_major(2250),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &open {
            ledger.apply(e);
        }
        history.extend(open);

        for (kind, amount) in [
            (TransactionKind::Payment, 500),
            (TransactionKind::Fee, 200),
            (TransactionKind::Payment, 1000),
        ] {
            let events = ledger
                .handle(&LedgerCommand::AppendTransaction(AppendTransaction {
                    ledger_id: id,
                    kind,
                    amount: Money::from_major(amount),
                    description: "entry".to_string(),
                    transaction_date: Utc::now(),
                    occurred_at: Utc::now(),
                }))
                .unwrap();
            for e in &events {
                ledger.apply(e);
            }
            history.extend(events);
        }

        let mut rehydrated = StudentLedger::empty(id);
        for e in &history {
            rehydrated.apply(e);
        }

        assert_eq!(rehydrated.balance(), ledger.balance());
        assert_eq!(rehydrated.version(), ledger.version());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the Kth appended record's balance snapshot equals
        /// `program_fee_total − Σ signed(amounts of records 1..=K)`.
        #[test]
        fn balance_snapshots_equal_prefix_sums(
            fee_total in 0i64..1_000_000,
            txs in prop::collection::vec((0usize..4, 1i64..100_000), 1..20)
        ) {
            let kinds = [
                TransactionKind::Fee,
                TransactionKind::Payment,
                TransactionKind::Refund,
                TransactionKind::Adjustment,
            ];

            let fee_total = Money::from_cents(fee_total);
            let mut ledger = opened(fee_total);
            let mut signed_sum = Money::ZERO;

            for (k, (kind_idx, cents)) in txs.into_iter().enumerate() {
                let kind = kinds[kind_idx];
                let amount = Money::from_cents(cents);

                let appended = append(&mut ledger, kind, amount).unwrap();
                signed_sum = signed_sum + kind.signed(amount);

                prop_assert_eq!(appended.sequence, (k as u64) + 1);
                prop_assert_eq!(appended.balance_after, fee_total - signed_sum);
            }

            prop_assert_eq!(ledger.balance(), fee_total - signed_sum);
        }
    }
}
