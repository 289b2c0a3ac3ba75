//! Port contracts for credit balance mutation.

pub mod ledger;

pub use ledger::{CreditLedger, LedgerError, LedgerResult};
