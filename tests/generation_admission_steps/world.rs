//! Shared world state for generation admission BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use reelforge::credit::{adapters::InMemoryCreditLedger, domain::CreditAmount};
use reelforge::generation::{
    adapters::{
        InMemoryAssetStore, InMemoryGenerationTaskRepository, LockingAdmissionGate,
        ScriptedProvider,
    },
    domain::GenerationTask,
    services::{
        GenerationPorts, GenerationService, OrchestrationError, OrchestrationSettings,
    },
};
use reelforge::identity::{
    adapters::StaticIdentityDirectory,
    domain::{PlanTier, UserId},
};
use rstest::fixture;

/// Scenario world for admission behaviour tests.
pub struct AdmissionWorld {
    pub service: GenerationService<DefaultClock>,
    pub ledger: Arc<InMemoryCreditLedger>,
    pub provider: Arc<ScriptedProvider>,
    pub user: UserId,
    pub last_result: Option<Result<GenerationTask, OrchestrationError>>,
}

impl AdmissionWorld {
    /// Creates a world whose user is on `plan` with `credits`.
    #[must_use]
    pub fn new(plan: PlanTier, credits: u64) -> Self {
        let user = UserId::new();
        let tasks = Arc::new(InMemoryGenerationTaskRepository::new());
        let ledger =
            Arc::new(InMemoryCreditLedger::new().with_balance(user, CreditAmount::new(credits)));
        let provider = Arc::new(ScriptedProvider::new());
        let clock = Arc::new(DefaultClock);
        let ports = GenerationPorts {
            tasks: tasks.clone(),
            ledger: ledger.clone(),
            admission: Arc::new(LockingAdmissionGate::new(
                tasks,
                ledger.clone(),
                Arc::clone(&clock),
            )),
            provider: provider.clone(),
            assets: Arc::new(InMemoryAssetStore::new()),
            plans: Arc::new(StaticIdentityDirectory::new().with_plan(user, plan)),
        };

        Self {
            service: GenerationService::new(ports, clock, OrchestrationSettings::default()),
            ledger,
            provider,
            user,
            last_result: None,
        }
    }
}

impl Default for AdmissionWorld {
    fn default() -> Self {
        Self::new(PlanTier::Basic, 0)
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> AdmissionWorld {
    AdmissionWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
