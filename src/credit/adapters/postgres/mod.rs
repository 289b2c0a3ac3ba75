//! `PostgreSQL` adapter for the credit ledger.

mod ledger;
mod models;
pub(crate) mod schema;

pub use ledger::{CreditPgPool, PostgresCreditLedger};
pub(crate) use ledger::{charge_in, lock_balance};

use crate::credit::ports::LedgerError;

impl From<diesel::result::Error> for LedgerError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}
