//! Facade over the external asynchronous generation provider.

use crate::generation::domain::{
    AspectRatio, GenerationMode, GenerationTask, OperationId, PersonGeneration, Resolution,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// New-video job sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSubmission {
    /// Mode and its payload.
    pub mode: GenerationMode,
    /// Prompt.
    pub prompt: String,
    /// Negative prompt.
    pub negative_prompt: Option<String>,
    /// Aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Resolution.
    pub resolution: Resolution,
    /// Seconds of output.
    pub duration: u32,
    /// Person-generation policy.
    pub person_generation: PersonGeneration,
}

impl GenerationSubmission {
    /// Builds the submission for an admitted task.
    #[must_use]
    pub fn from_task(task: &GenerationTask) -> Self {
        Self {
            mode: task.mode().clone(),
            prompt: task.prompt().to_owned(),
            negative_prompt: task.negative_prompt().map(str::to_owned),
            aspect_ratio: task.aspect_ratio(),
            resolution: task.resolution(),
            duration: task.duration(),
            person_generation: task.person_generation(),
        }
    }
}

/// Continuation job sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSubmission {
    /// Provider handle of the video being extended.
    pub source_video_uri: String,
    /// Prompt of the source task.
    pub original_prompt: String,
    /// Caller's continuation prompt.
    pub continuation_prompt: String,
    /// Combined prompt sent to the model.
    pub prompt: String,
    /// Aspect ratio inherited from the source.
    pub aspect_ratio: AspectRatio,
    /// Person-generation policy.
    pub person_generation: PersonGeneration,
}

/// Job submitted during admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSubmission {
    /// New video.
    Generation(GenerationSubmission),
    /// Extension of an existing video.
    Extension(ExtensionSubmission),
}

/// Provider-side state of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    /// Accepted, not started.
    Queued,
    /// In progress.
    Running,
    /// Finished with a downloadable result.
    Done {
        /// Provider handle of the produced video.
        result_uri: String,
    },
    /// Finished without a result.
    Error {
        /// Provider error code, if reported.
        code: Option<String>,
        /// Provider error message.
        message: String,
    },
}

/// Provider contract.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Starts a new-video job.
    async fn submit(&self, submission: &GenerationSubmission) -> ProviderResult<OperationId>;

    /// Starts a continuation job.
    async fn submit_extension(
        &self,
        submission: &ExtensionSubmission,
    ) -> ProviderResult<OperationId>;

    /// Reports the state of an operation.
    async fn poll_status(&self, operation_id: &OperationId) -> ProviderResult<OperationStatus>;

    /// Downloads a finished video.
    async fn fetch_result(&self, result_uri: &str) -> ProviderResult<Vec<u8>>;
}

/// Provider failures. Every variant is surfaced as `PROVIDER_ERROR` and is
/// safe to retry.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The call did not finish in time.
    #[error("provider call timed out")]
    Timeout,

    /// The provider is unreachable or overloaded.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the job (safety filter, rate limit, bad input).
    #[error("provider rejected the request ({code}): {message}")]
    Rejected {
        /// Provider error code.
        code: String,
        /// Provider error message.
        message: String,
    },

    /// The provider answered with something unexpected.
    #[error("unexpected provider response: {0}")]
    Protocol(String),

    /// Network-level failure.
    #[error("provider transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Provider code to record on a failed task.
    #[must_use]
    pub fn failure_code(&self) -> &str {
        match self {
            Self::Rejected { code, .. } => code,
            Self::Timeout | Self::Unavailable(_) | Self::Protocol(_) | Self::Transport(_) => {
                crate::generation::domain::PROVIDER_ERROR
            }
        }
    }
}
