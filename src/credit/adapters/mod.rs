//! Credit ledger adapters.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCreditLedger;
