//! Caller identity and plan entitlements.
//!
//! Session verification itself lives outside this crate; this module only
//! models the identifiers, subscription tiers and regions that the
//! generation pipeline consumes, plus the port contracts used to resolve
//! them:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;
