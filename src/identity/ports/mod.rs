//! Port contracts for resolving callers and their entitlements.

pub mod directory;

pub use directory::{IdentityError, IdentityResult, IdentityVerifier, PlanDirectory};
