//! Credit ledger domain values.

mod amount;
mod transaction;

pub use amount::CreditAmount;
pub use transaction::{
    ChargeOutcome, CreditTransaction, LedgerPosting, ParseTransactionKindError, RefundOutcome,
    TransactionKind,
};
