//! Shared wiring for HTTP integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeDelta, Utc};
use http_body_util::BodyExt;
use mockable::DefaultClock;
use reelforge::api::{AppState, REGION_HEADER, router};
use reelforge::credit::{adapters::InMemoryCreditLedger, domain::CreditAmount, ports::CreditLedger};
use reelforge::generation::{
    adapters::{
        InMemoryAssetStore, InMemoryGenerationTaskRepository, LockingAdmissionGate,
        ScriptedProvider,
    },
    domain::{
        AspectRatio, GenerationDraft, GenerationMode, GenerationModeKind, GenerationStatus,
        GenerationTask, GenerationTaskId, PersistedGenerationTaskData, PersonGeneration,
        Resolution, StoredAsset, credit_cost,
    },
    ports::GenerationTaskRepository,
    services::{GenerationFinalizer, GenerationPorts, OrchestrationSettings},
};
use reelforge::identity::{
    adapters::StaticIdentityDirectory,
    domain::{PlanTier, UserId},
};
use serde_json::Value;
use tower::ServiceExt;

/// Token issued to the primary test user.
pub const TOKEN: &str = "token-primary";
/// Token issued to a second user.
pub const OTHER_TOKEN: &str = "token-other";

/// Router plus handles on the in-memory adapters behind it.
pub struct TestApp {
    pub router: Router,
    pub tasks: Arc<InMemoryGenerationTaskRepository>,
    pub ledger: Arc<InMemoryCreditLedger>,
    pub provider: Arc<ScriptedProvider>,
    pub finalizer: GenerationFinalizer<DefaultClock>,
    pub user: UserId,
    pub other_user: UserId,
}

impl TestApp {
    /// Builds an app where the primary user is on `plan` with `balance`
    /// credits and the second user is on basic with 100.
    pub fn new(plan: PlanTier, balance: u64) -> Self {
        let user = UserId::new();
        let other_user = UserId::new();
        let directory = Arc::new(
            StaticIdentityDirectory::new()
                .with_token(TOKEN, user)
                .with_plan(user, plan)
                .with_token(OTHER_TOKEN, other_user)
                .with_plan(other_user, PlanTier::Basic),
        );
        let tasks = Arc::new(InMemoryGenerationTaskRepository::new());
        let ledger = Arc::new(
            InMemoryCreditLedger::new()
                .with_balance(user, CreditAmount::new(balance))
                .with_balance(other_user, CreditAmount::new(100)),
        );
        let provider = Arc::new(ScriptedProvider::new());
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
            assets: Arc::new(InMemoryAssetStore::new()),
            plans: directory.clone(),
        };
        let settings = OrchestrationSettings::default();
        let finalizer = GenerationFinalizer::new(ports.clone(), clock, settings.task_max_age);
        Self {
            router: router(AppState::new(ports, directory, settings)),
            tasks,
            ledger,
            provider,
            finalizer,
            user,
            other_user,
        }
    }

    /// Sends `request` and returns the status and parsed JSON body.
    pub async fn send(&self, request: Request<Body>) -> eyre::Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    /// Current balance of `user`.
    pub async fn balance(&self, user: UserId) -> eyre::Result<u64> {
        Ok(self.ledger.balance(user).await?.value())
    }

    /// Stores a completed task owned by the primary user.
    pub async fn seed_completed(&self, chain_duration: u32) -> eyre::Result<GenerationTask> {
        let created_at = Utc::now() - TimeDelta::hours(1);
        let task = GenerationTask::from_persisted(PersistedGenerationTaskData {
            id: GenerationTaskId::new(),
            draft: GenerationDraft {
                user_id: self.user,
                mode: GenerationMode::TextToVideo,
                prompt: "a harbour at night".to_owned(),
                negative_prompt: None,
                aspect_ratio: AspectRatio::Landscape,
                resolution: Resolution::Hd720,
                duration: 8,
                chain_duration,
                person_generation: PersonGeneration::AllowAll,
                credit_cost: credit_cost(GenerationModeKind::TextToVideo, Resolution::Hd720, 8),
            },
            status: GenerationStatus::Completed,
            operation_id: None,
            provider_video_uri: Some("https://provider.example/files/source.mp4".to_owned()),
            asset: Some(StoredAsset {
                location: format!("{}/source.mp4", self.user),
                size_bytes: 4,
                sha256: "ab".repeat(32),
            }),
            failure: None,
            refunded: false,
            created_at,
            updated_at: created_at + TimeDelta::seconds(80),
            completed_at: Some(created_at + TimeDelta::seconds(80)),
        });
        self.tasks.store(&task).await?;
        Ok(task)
    }
}

/// `POST` with a JSON body.
pub fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    post_raw(uri, token, body.to_string())
}

/// `POST` with a raw body and JSON content type.
pub fn post_raw(uri: &str, token: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(bearer) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {bearer}"));
    }
    builder.body(body.into()).expect("request should build")
}

/// `POST` from a caller in `region`.
pub fn post_json_from(uri: &str, token: &str, region: &str, body: &Value) -> Request<Body> {
    let mut request = post_json(uri, Some(token), body);
    request.headers_mut().insert(
        REGION_HEADER,
        region.parse().expect("region should be a valid header value"),
    );
    request
}

/// `GET` with an optional bearer token.
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(bearer) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {bearer}"));
    }
    builder.body(Body::empty()).expect("request should build")
}

/// Scenario A payload: 4 s of 720p text-to-video.
pub fn text_payload() -> Value {
    serde_json::json!({
        "prompt": "a cat",
        "aspect_ratio": "16:9",
        "resolution": "720p",
        "duration": 4,
        "generation_mode": "text-to-video"
    })
}

/// Reads a string field from a JSON body.
pub fn text<'a>(body: &'a Value, field: &str) -> eyre::Result<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| eyre::eyre!("missing string field '{field}' in {body}"))
}
