//! Reelforge: credit-metered video generation orchestration.
//!
//! Callers submit generation requests over HTTP. Each request is validated,
//! admitted against the caller's plan concurrency limit and credit balance,
//! submitted to an external video model, and then driven to a terminal
//! state by a background finalizer that stores the produced video and
//! refunds credits when the provider never delivers.
//!
//! # Architecture
//!
//! Reelforge follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, APIs, etc.)
//!
//! # Modules
//!
//! - [`generation`]: Task lifecycle, admission, extension and statistics
//! - [`credit`]: Balances and the charge/refund ledger
//! - [`identity`]: Callers, plan tiers and regions
//! - [`api`]: HTTP surface
//! - [`config`]: Environment configuration
//! - [`telemetry`]: Tracing subscriber set-up

pub mod api;
pub mod config;
pub mod credit;
pub mod generation;
pub mod identity;
pub mod telemetry;
