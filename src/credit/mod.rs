//! Per-user credit balances and the charge/refund ledger.
//!
//! Every task carries at most one charge and at most one refund; both are
//! recorded as [`domain::CreditTransaction`] entries keyed by the task id so
//! the store itself can reject duplicates.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;
