//! Wire shapes of requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::generation::{
    domain::{GenerationMode, GenerationStatus, GenerationTask, can_extend},
    ports::TaskPage,
};

/// Body of `POST /v1/video/extend`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtendVideoBody {
    /// Task whose video is continued.
    #[serde(default)]
    pub source_video_id: Option<String>,
    /// Continuation prompt.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Person-generation policy.
    #[serde(default)]
    pub person_generation: Option<String>,
}

/// Response to an accepted creation or extension.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationAccepted {
    /// New task.
    pub task_id: String,
    /// Provider operation handle.
    pub operation_id: Option<String>,
    /// Task status, `processing` on success.
    pub status: GenerationStatus,
    /// Credits charged.
    pub credit_cost: u64,
    /// Length of the video once this job completes.
    pub chain_duration: u32,
}

impl From<&GenerationTask> for GenerationAccepted {
    fn from(task: &GenerationTask) -> Self {
        Self {
            task_id: task.id().to_string(),
            operation_id: task.operation_id().map(|id| id.as_str().to_owned()),
            status: task.status(),
            credit_cost: task.credit_cost().value(),
            chain_duration: task.chain_duration(),
        }
    }
}

/// Query of `GET /v1/video/tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTasksParams {
    /// Status filter.
    pub status: Option<String>,
    /// Page size.
    pub limit: Option<usize>,
    /// Rows to skip.
    pub offset: Option<usize>,
}

/// Query of `GET /v1/stats/video-generation`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsParams {
    /// Window name.
    pub window: Option<String>,
}

/// Task as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    /// Task identifier.
    pub id: String,
    /// Mode name.
    pub generation_mode: &'static str,
    /// Prompt.
    pub prompt: String,
    /// Negative prompt.
    pub negative_prompt: Option<String>,
    /// Aspect ratio.
    pub aspect_ratio: &'static str,
    /// Resolution.
    pub resolution: &'static str,
    /// Seconds produced by this job.
    pub duration: u32,
    /// Length of the resulting video.
    pub chain_duration: u32,
    /// Person-generation policy.
    pub person_generation: &'static str,
    /// Reference image URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_images: Option<Vec<String>>,
    /// Opening frame URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_frame_url: Option<String>,
    /// Closing frame URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame_url: Option<String>,
    /// Extended task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_video_id: Option<String>,
    /// Lifecycle status.
    pub status: GenerationStatus,
    /// Provider operation handle.
    pub operation_id: Option<String>,
    /// Credits charged.
    pub credit_cost: u64,
    /// Stored asset key.
    pub video_location: Option<String>,
    /// Stored asset size.
    pub video_size_bytes: Option<u64>,
    /// Stored asset checksum.
    pub video_sha256: Option<String>,
    /// Failure code.
    pub error_code: Option<String>,
    /// Failure message.
    pub error_message: Option<String>,
    /// Whether the charge was returned.
    pub refunded: bool,
    /// Whether the video can be extended.
    pub can_extend: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&GenerationTask> for TaskView {
    fn from(task: &GenerationTask) -> Self {
        let (reference_images, first_frame_url, last_frame_url) = match task.mode() {
            GenerationMode::ReferenceImages { reference_images } => {
                (Some(reference_images.as_slice().to_vec()), None, None)
            }
            GenerationMode::FirstLastFrame {
                first_frame_url,
                last_frame_url,
            } => (
                None,
                Some(first_frame_url.clone()),
                Some(last_frame_url.clone()),
            ),
            GenerationMode::TextToVideo | GenerationMode::ExtendVideo { .. } => {
                (None, None, None)
            }
        };
        let asset = task.asset();
        let failure = task.failure();
        Self {
            id: task.id().to_string(),
            generation_mode: task.mode().kind().as_str(),
            prompt: task.prompt().to_owned(),
            negative_prompt: task.negative_prompt().map(str::to_owned),
            aspect_ratio: task.aspect_ratio().as_str(),
            resolution: task.resolution().as_str(),
            duration: task.duration(),
            chain_duration: task.chain_duration(),
            person_generation: task.person_generation().as_str(),
            reference_images,
            first_frame_url,
            last_frame_url,
            source_video_id: task.mode().source_video_id().map(|id| id.to_string()),
            status: task.status(),
            operation_id: task.operation_id().map(|id| id.as_str().to_owned()),
            credit_cost: task.credit_cost().value(),
            video_location: asset.map(|stored| stored.location.clone()),
            video_size_bytes: asset.map(|stored| stored.size_bytes),
            video_sha256: asset.map(|stored| stored.sha256.clone()),
            error_code: failure.map(|failed| failed.code.clone()),
            error_message: failure.map(|failed| failed.message.clone()),
            refunded: task.refunded(),
            can_extend: can_extend(
                task.status(),
                task.resolution(),
                task.chain_duration(),
                task.provider_video_uri(),
            ),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
            completed_at: task.completed_at(),
        }
    }
}

/// One page of tasks.
#[derive(Debug, Clone, Serialize)]
pub struct TaskListResponse {
    /// Tasks, newest first.
    pub tasks: Vec<TaskView>,
    /// Matching tasks across all pages.
    pub total: usize,
    /// Page size applied.
    pub limit: usize,
    /// Rows skipped.
    pub offset: usize,
}

impl TaskListResponse {
    pub(crate) fn from_page(page: &TaskPage, limit: usize, offset: usize) -> Self {
        Self {
            tasks: page.tasks.iter().map(TaskView::from).collect(),
            total: page.total,
            limit,
            offset,
        }
    }
}
