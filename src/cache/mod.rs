//! Stage-key ledger for committed build layers

mod ledger;

pub use ledger::{LayerLedger, LedgerEntry};
