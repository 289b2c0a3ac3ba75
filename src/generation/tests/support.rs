//! Shared fixtures for generation unit tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::credit::{adapters::InMemoryCreditLedger, domain::CreditAmount};
use crate::generation::{
    adapters::{
        InMemoryAssetStore, InMemoryGenerationTaskRepository, LockingAdmissionGate,
        ScriptedProvider,
    },
    domain::{
        AspectRatio, GenerationDraft, GenerationMode, GenerationModeKind, GenerationStatus,
        GenerationTask, GenerationTaskId, PersistedGenerationTaskData, PersonGeneration,
        Resolution, StoredAsset, credit_cost,
    },
    ports::GenerationProvider,
    services::{GenerationFinalizer, GenerationPorts, GenerationService, OrchestrationSettings},
    validation::CreateGenerationRequest,
};
use crate::identity::{
    adapters::StaticIdentityDirectory,
    domain::{PlanTier, UserId},
};

/// Clock that only moves when told to.
#[derive(Debug)]
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn new() -> Self {
        Self {
            now: Mutex::new(
                Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
                    .single()
                    .expect("valid start instant"),
            ),
        }
    }

    pub(super) fn advance(&self, by: TimeDelta) {
        *self.now.lock().expect("clock lock") += by;
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

/// In-memory wiring for one funded user.
pub(super) struct Harness {
    pub tasks: Arc<InMemoryGenerationTaskRepository>,
    pub ledger: Arc<InMemoryCreditLedger>,
    pub provider: Arc<ScriptedProvider>,
    pub assets: Arc<InMemoryAssetStore>,
    pub directory: Arc<StaticIdentityDirectory>,
    pub clock: Arc<ManualClock>,
    pub user: UserId,
}

impl Harness {
    pub(super) fn new(plan: PlanTier, balance: u64) -> Self {
        let user = UserId::new();
        Self {
            tasks: Arc::new(InMemoryGenerationTaskRepository::new()),
            ledger: Arc::new(
                InMemoryCreditLedger::new().with_balance(user, CreditAmount::new(balance)),
            ),
            provider: Arc::new(ScriptedProvider::new()),
            assets: Arc::new(InMemoryAssetStore::new()),
            directory: Arc::new(StaticIdentityDirectory::new().with_plan(user, plan)),
            clock: Arc::new(ManualClock::new()),
            user,
        }
    }

    pub(super) fn ports_with_provider(
        &self,
        provider: Arc<dyn GenerationProvider>,
    ) -> GenerationPorts {
        GenerationPorts {
            tasks: self.tasks.clone(),
            ledger: self.ledger.clone(),
            admission: Arc::new(LockingAdmissionGate::new(
                self.tasks.clone(),
                self.ledger.clone(),
                Arc::clone(&self.clock),
            )),
            provider,
            assets: self.assets.clone(),
            plans: self.directory.clone(),
        }
    }

    pub(super) fn ports(&self) -> GenerationPorts {
        self.ports_with_provider(self.provider.clone())
    }

    pub(super) fn service(&self) -> GenerationService<ManualClock> {
        GenerationService::new(
            self.ports(),
            Arc::clone(&self.clock),
            OrchestrationSettings::default(),
        )
    }

    pub(super) fn finalizer(&self) -> GenerationFinalizer<ManualClock> {
        GenerationFinalizer::new(
            self.ports(),
            Arc::clone(&self.clock),
            OrchestrationSettings::default().task_max_age,
        )
    }
}

/// Valid text-to-video request (4 s at 720p, 40 credits).
pub(super) fn text_request() -> CreateGenerationRequest {
    CreateGenerationRequest {
        prompt: Some("a cat".to_owned()),
        aspect_ratio: Some("16:9".to_owned()),
        resolution: Some("720p".to_owned()),
        duration: Some(4),
        generation_mode: Some("text-to-video".to_owned()),
        ..CreateGenerationRequest::default()
    }
}

/// A completed text-to-video task with the given properties.
pub(super) fn completed_task(
    user_id: UserId,
    resolution: Resolution,
    chain_duration: u32,
    provider_video_uri: Option<&str>,
) -> GenerationTask {
    let created_at = Utc
        .with_ymd_and_hms(2026, 2, 1, 9, 0, 0)
        .single()
        .expect("valid creation instant");
    GenerationTask::from_persisted(PersistedGenerationTaskData {
        id: GenerationTaskId::new(),
        draft: GenerationDraft {
            user_id,
            mode: GenerationMode::TextToVideo,
            prompt: "a lighthouse at dusk".to_owned(),
            negative_prompt: None,
            aspect_ratio: AspectRatio::Landscape,
            resolution,
            duration: 8,
            chain_duration,
            person_generation: PersonGeneration::AllowAll,
            credit_cost: credit_cost(GenerationModeKind::TextToVideo, resolution, 8),
        },
        status: GenerationStatus::Completed,
        operation_id: None,
        provider_video_uri: provider_video_uri.map(str::to_owned),
        asset: Some(StoredAsset {
            location: "source.mp4".to_owned(),
            size_bytes: 1,
            sha256: "00".repeat(32),
        }),
        failure: None,
        refunded: false,
        created_at,
        updated_at: created_at + TimeDelta::seconds(90),
        completed_at: Some(created_at + TimeDelta::seconds(90)),
    })
}
