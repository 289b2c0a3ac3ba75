//! Shared wiring for in-memory pipeline tests.

use std::sync::Arc;

use mockable::DefaultClock;
use reelforge::credit::{adapters::InMemoryCreditLedger, domain::CreditAmount, ports::CreditLedger};
use reelforge::generation::{
    adapters::{
        InMemoryAssetStore, InMemoryGenerationTaskRepository, LockingAdmissionGate,
        ScriptedProvider,
    },
    domain::{GenerationTask, OperationId},
    services::{GenerationFinalizer, GenerationPorts, GenerationService, OrchestrationSettings},
    validation::CreateGenerationRequest,
};
use reelforge::identity::{
    adapters::StaticIdentityDirectory,
    domain::{PlanTier, UserId},
};
use rstest::fixture;

/// Services and adapters for one funded user.
pub struct Pipeline {
    pub service: Arc<GenerationService<DefaultClock>>,
    pub finalizer: GenerationFinalizer<DefaultClock>,
    pub tasks: Arc<InMemoryGenerationTaskRepository>,
    pub ledger: Arc<InMemoryCreditLedger>,
    pub provider: Arc<ScriptedProvider>,
    pub assets: Arc<InMemoryAssetStore>,
    pub user: UserId,
}

impl Pipeline {
    /// Wires a pipeline whose user is on `plan` with `balance` credits.
    pub fn new(plan: PlanTier, balance: u64) -> Self {
        let user = UserId::new();
        let tasks = Arc::new(InMemoryGenerationTaskRepository::new());
        let ledger =
            Arc::new(InMemoryCreditLedger::new().with_balance(user, CreditAmount::new(balance)));
        let provider = Arc::new(ScriptedProvider::new());
        let assets = Arc::new(InMemoryAssetStore::new());
        let clock = Arc::new(DefaultClock);
        let ports = GenerationPorts {
            tasks: tasks.clone(),
            ledger: ledger.clone(),
            admission: Arc::new(LockingAdmissionGate::new(
                tasks.clone(),
                ledger.clone(),
                Arc::clone(&clock),
            )),
            provider: provider.clone(),
            assets: assets.clone(),
            plans: Arc::new(StaticIdentityDirectory::new().with_plan(user, plan)),
        };
        let settings = OrchestrationSettings::default();
        Self {
            service: Arc::new(GenerationService::new(
                ports.clone(),
                Arc::clone(&clock),
                settings,
            )),
            finalizer: GenerationFinalizer::new(ports, clock, settings.task_max_age),
            tasks,
            ledger,
            provider,
            assets,
            user,
        }
    }

    /// Current balance of the pipeline's user.
    pub async fn balance(&self) -> eyre::Result<u64> {
        Ok(self.ledger.balance(self.user).await?.value())
    }

    /// Completes `task` at the provider and runs one finalizer tick.
    pub async fn deliver(&self, task: &GenerationTask, bytes: &[u8]) -> eyre::Result<()> {
        let operation = task
            .operation_id()
            .cloned()
            .ok_or_else(|| eyre::eyre!("task {} was never submitted", task.id()))?;
        self.provider.complete(
            &operation,
            &format!("https://provider.example/files/{}.mp4", operation.as_str()),
            bytes,
        );
        self.finalizer.tick().await?;
        Ok(())
    }
}

/// Fixture: basic plan, 1000 credits.
#[fixture]
pub fn pipeline() -> Pipeline {
    Pipeline::new(PlanTier::Basic, 1_000)
}

/// 8 s of 720p text-to-video (80 credits).
pub fn eight_second_request() -> CreateGenerationRequest {
    CreateGenerationRequest {
        prompt: Some("waves breaking on a reef".to_owned()),
        aspect_ratio: Some("16:9".to_owned()),
        resolution: Some("720p".to_owned()),
        duration: Some(8),
        generation_mode: Some("text-to-video".to_owned()),
        ..CreateGenerationRequest::default()
    }
}

/// Operation id of `task`, or an error when it was never submitted.
pub fn operation_of(task: &GenerationTask) -> eyre::Result<OperationId> {
    task.operation_id()
        .cloned()
        .ok_or_else(|| eyre::eyre!("task {} has no operation id", task.id()))
}
