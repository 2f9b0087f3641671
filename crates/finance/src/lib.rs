//! `acadledger-finance`
//!
//! **Responsibility:** the per-(student, program) finance ledger.
//!
//! Transactions are append-only facts; the running balance is a derived
//! snapshot carried on each appended record, replayable from the stream.

pub mod ledger;

pub use ledger::{
    AppendTransaction, LedgerCommand, LedgerEvent, LedgerId, LedgerOpened, OpenLedger,
    StudentLedger, TransactionAppended, TransactionKind,
};
