//! Identity adapters.

pub mod memory;

pub use memory::{ParseTokenEntryError, StaticIdentityDirectory};
