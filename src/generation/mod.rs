//! Video generation tasks: validation, admission, provider submission,
//! background finalisation, extension lineage and statistics.
//!
//! A task is admitted (concurrency slot plus credit charge) and stored in
//! `pending`, handed to the provider, and then advanced by the finalizer
//! through `processing`, `downloading` and `completed` using writes that
//! only apply when the stored status matches the expected predecessor.
//!
//! - Domain types in [`domain`]
//! - Request validation in [`validation`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
pub mod validation;
