//! Generation task aggregate root.

use super::{
    AspectRatio, GenerationDomainError, GenerationMode, GenerationStatus, GenerationTaskId,
    OperationId, PersonGeneration, Resolution,
};
use crate::credit::domain::CreditAmount;
use crate::identity::domain::UserId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Failure code for provider-side errors without a more specific code.
pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";
/// Failure code for jobs that outlived the maximum task age.
pub const TIMEOUT: &str = "TIMEOUT";
/// Failure code for pending tasks whose submission was never recorded.
pub const SUBMISSION_ORPHANED: &str = "SUBMISSION_ORPHANED";
/// Failure code for results that could not be stored.
pub const PERSISTENCE_ERROR: &str = "PERSISTENCE_ERROR";

/// Machine-readable failure recorded on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Failure code, e.g. [`TIMEOUT`].
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

impl TaskFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Durable location of a finished video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    /// Storage key, `{user_id}/{task_id}.mp4`.
    pub location: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the content.
    pub sha256: String,
}

/// Inputs fixed when a task is admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationDraft {
    /// Owner.
    pub user_id: UserId,
    /// Mode and its payload.
    pub mode: GenerationMode,
    /// Prompt sent to the provider.
    pub prompt: String,
    /// Optional negative prompt.
    pub negative_prompt: Option<String>,
    /// Frame aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Output resolution.
    pub resolution: Resolution,
    /// Seconds produced by this job.
    pub duration: u32,
    /// Realised length of the resulting video including prior extensions.
    pub chain_duration: u32,
    /// Person-generation policy.
    pub person_generation: PersonGeneration,
    /// Credits charged for this job.
    pub credit_cost: CreditAmount,
}

/// Generation task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationTask {
    id: GenerationTaskId,
    user_id: UserId,
    mode: GenerationMode,
    prompt: String,
    negative_prompt: Option<String>,
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    duration: u32,
    chain_duration: u32,
    person_generation: PersonGeneration,
    credit_cost: CreditAmount,
    status: GenerationStatus,
    operation_id: Option<OperationId>,
    provider_video_uri: Option<String>,
    asset: Option<StoredAsset>,
    failure: Option<TaskFailure>,
    refunded: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedGenerationTaskData {
    /// Task identifier.
    pub id: GenerationTaskId,
    /// Admission-time inputs.
    pub draft: GenerationDraft,
    /// Lifecycle status.
    pub status: GenerationStatus,
    /// Provider operation handle.
    pub operation_id: Option<OperationId>,
    /// Provider handle of the produced video.
    pub provider_video_uri: Option<String>,
    /// Stored result.
    pub asset: Option<StoredAsset>,
    /// Recorded failure.
    pub failure: Option<TaskFailure>,
    /// Whether the charge was returned.
    pub refunded: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationTask {
    /// Creates a `pending` task from admission inputs.
    #[must_use]
    pub fn new_pending(draft: GenerationDraft, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: GenerationTaskId::new(),
            user_id: draft.user_id,
            mode: draft.mode,
            prompt: draft.prompt,
            negative_prompt: draft.negative_prompt,
            aspect_ratio: draft.aspect_ratio,
            resolution: draft.resolution,
            duration: draft.duration,
            chain_duration: draft.chain_duration,
            person_generation: draft.person_generation,
            credit_cost: draft.credit_cost,
            status: GenerationStatus::Pending,
            operation_id: None,
            provider_video_uri: None,
            asset: None,
            failure: None,
            refunded: false,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedGenerationTaskData) -> Self {
        let PersistedGenerationTaskData {
            id,
            draft,
            status,
            operation_id,
            provider_video_uri,
            asset,
            failure,
            refunded,
            created_at,
            updated_at,
            completed_at,
        } = data;
        Self {
            id,
            user_id: draft.user_id,
            mode: draft.mode,
            prompt: draft.prompt,
            negative_prompt: draft.negative_prompt,
            aspect_ratio: draft.aspect_ratio,
            resolution: draft.resolution,
            duration: draft.duration,
            chain_duration: draft.chain_duration,
            person_generation: draft.person_generation,
            credit_cost: draft.credit_cost,
            status,
            operation_id,
            provider_video_uri,
            asset,
            failure,
            refunded,
            created_at,
            updated_at,
            completed_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> GenerationTaskId {
        self.id
    }

    /// Returns the owner.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the mode and its payload.
    #[must_use]
    pub const fn mode(&self) -> &GenerationMode {
        &self.mode
    }

    /// Returns the prompt sent to the provider.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the negative prompt, if any.
    #[must_use]
    pub fn negative_prompt(&self) -> Option<&str> {
        self.negative_prompt.as_deref()
    }

    /// Returns the aspect ratio.
    #[must_use]
    pub const fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    /// Returns the resolution.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Returns the seconds produced by this job.
    #[must_use]
    pub const fn duration(&self) -> u32 {
        self.duration
    }

    /// Returns the realised length of the video this task produces.
    #[must_use]
    pub const fn chain_duration(&self) -> u32 {
        self.chain_duration
    }

    /// Returns the person-generation policy.
    #[must_use]
    pub const fn person_generation(&self) -> PersonGeneration {
        self.person_generation
    }

    /// Returns the credits charged at admission.
    #[must_use]
    pub const fn credit_cost(&self) -> CreditAmount {
        self.credit_cost
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> GenerationStatus {
        self.status
    }

    /// Returns the provider operation handle once submitted.
    #[must_use]
    pub const fn operation_id(&self) -> Option<&OperationId> {
        self.operation_id.as_ref()
    }

    /// Returns the provider handle of the produced video.
    #[must_use]
    pub fn provider_video_uri(&self) -> Option<&str> {
        self.provider_video_uri.as_deref()
    }

    /// Returns the stored result.
    #[must_use]
    pub const fn asset(&self) -> Option<&StoredAsset> {
        self.asset.as_ref()
    }

    /// Returns the recorded failure.
    #[must_use]
    pub const fn failure(&self) -> Option<&TaskFailure> {
        self.failure.as_ref()
    }

    /// Whether the charge has been returned.
    #[must_use]
    pub const fn refunded(&self) -> bool {
        self.refunded
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns when the task reached a terminal status.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Seconds between creation and completion for finished tasks.
    #[must_use]
    pub fn latency_seconds(&self) -> Option<i64> {
        self.completed_at
            .map(|done| (done - self.created_at).num_seconds())
    }

    /// Records the provider's acceptance: `pending -> processing`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::InvalidStateTransition`] when the
    /// task is not pending.
    pub fn mark_submitted(
        &mut self,
        operation_id: OperationId,
        clock: &impl Clock,
    ) -> Result<(), GenerationDomainError> {
        self.transition_to(GenerationStatus::Processing, clock)?;
        self.operation_id = Some(operation_id);
        Ok(())
    }

    /// Records provider completion: `processing -> downloading`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::InvalidStateTransition`] when the
    /// task is not processing.
    pub fn mark_downloading(
        &mut self,
        provider_video_uri: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), GenerationDomainError> {
        self.transition_to(GenerationStatus::Downloading, clock)?;
        self.provider_video_uri = Some(provider_video_uri.into());
        Ok(())
    }

    /// Records the stored asset: `downloading -> completed`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::InvalidStateTransition`] when the
    /// task is not downloading.
    pub fn mark_completed(
        &mut self,
        asset: StoredAsset,
        clock: &impl Clock,
    ) -> Result<(), GenerationDomainError> {
        self.transition_to(GenerationStatus::Completed, clock)?;
        self.asset = Some(asset);
        Ok(())
    }

    /// Records an unrecoverable error.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::InvalidStateTransition`] when the
    /// task is already terminal.
    pub fn mark_failed(
        &mut self,
        failure: TaskFailure,
        clock: &impl Clock,
    ) -> Result<(), GenerationDomainError> {
        self.transition_to(GenerationStatus::Failed, clock)?;
        self.failure = Some(failure);
        Ok(())
    }

    /// Records owner cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::InvalidStateTransition`] unless the
    /// task is pending or processing.
    pub fn mark_cancelled(&mut self, clock: &impl Clock) -> Result<(), GenerationDomainError> {
        self.transition_to(GenerationStatus::Cancelled, clock)
    }

    /// Flags the charge as returned.
    pub const fn mark_refunded(&mut self) {
        self.refunded = true;
    }

    /// Returns a copy carrying `refunded` from the stored record.
    #[must_use]
    pub(crate) fn with_refunded(mut self, refunded: bool) -> Self {
        self.refunded = refunded;
        self
    }

    /// Whether a failure or cancellation in the current status returns the
    /// charge. Once the provider has delivered, compute is consumed.
    #[must_use]
    pub fn is_refund_eligible(&self) -> bool {
        !self.refunded && self.provider_video_uri.is_none()
    }

    fn transition_to(
        &mut self,
        target: GenerationStatus,
        clock: &impl Clock,
    ) -> Result<(), GenerationDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(GenerationDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }
        let timestamp = clock.utc();
        self.status = target;
        self.updated_at = timestamp;
        if target.is_terminal() {
            self.completed_at = Some(timestamp);
        }
        Ok(())
    }
}
