//! Orchestration services for the generation lifecycle.

mod admission;
mod error;
mod extension;
mod finalizer;
mod generation;
mod settlement;
mod stats;

pub use admission::AdmissionController;
pub use error::{ErrorClass, OrchestrationError, OrchestrationResult};
pub use extension::{ExtensionRequest, ExtensionService, compose_extension_prompt};
pub use finalizer::{FinalizeOutcome, GenerationFinalizer, TickReport};
pub use generation::GenerationService;
pub use settlement::{CreditSettlement, SettlementOutcome};
pub use stats::{
    AlertLevel, FailureReason, GenerationStats, GenerationStatsService, LATENCY_TARGET_SECONDS,
    LatencySummary, ParameterBreakdown, ParseStatsWindowError, SUCCESS_RATE_TARGET, StatsWindow,
    StatusCounts, TargetHealth,
};

use crate::credit::ports::CreditLedger;
use crate::generation::ports::{
    AdmissionGate, AssetStore, GenerationProvider, GenerationTaskRepository,
};
use crate::identity::ports::PlanDirectory;
use std::sync::Arc;
use std::time::Duration;

/// Port implementations shared by the orchestration services.
#[derive(Clone)]
pub struct GenerationPorts {
    /// Task store.
    pub tasks: Arc<dyn GenerationTaskRepository>,
    /// Credit ledger.
    pub ledger: Arc<dyn CreditLedger>,
    /// Atomic count-charge-insert gate.
    pub admission: Arc<dyn AdmissionGate>,
    /// External generation provider.
    pub provider: Arc<dyn GenerationProvider>,
    /// Result storage.
    pub assets: Arc<dyn AssetStore>,
    /// Plan lookup for concurrency limits.
    pub plans: Arc<dyn PlanDirectory>,
}

/// Timeouts and cadence for orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestrationSettings {
    /// Bound on one provider submission.
    pub submit_timeout: Duration,
    /// Bound on the admission charge.
    pub charge_timeout: Duration,
    /// Delay between finalizer ticks.
    pub poll_interval: Duration,
    /// Age after which a non-terminal task is failed.
    pub task_max_age: Duration,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(15),
            charge_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(30),
            task_max_age: Duration::from_secs(600),
        }
    }
}
