//! Diesel row models and their mapping to the task aggregate.

use super::schema::generation_tasks;
use crate::credit::domain::CreditAmount;
use crate::generation::{
    domain::{
        AspectRatio, GenerationDraft, GenerationMode, GenerationModeKind, GenerationStatus,
        GenerationTask, GenerationTaskId, OperationId, PersistedGenerationTaskData,
        PersonGeneration, ReferenceImages, Resolution, StoredAsset, TaskFailure,
    },
    ports::{TaskRepositoryError, TaskRepositoryResult},
};
use crate::identity::domain::UserId;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Full task row, used for reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = generation_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GenerationTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owner.
    pub user_id: uuid::Uuid,
    /// Mode name.
    pub generation_mode: String,
    /// Prompt.
    pub prompt: String,
    /// Negative prompt.
    pub negative_prompt: Option<String>,
    /// Aspect ratio.
    pub aspect_ratio: String,
    /// Resolution.
    pub resolution: String,
    /// Seconds produced by this job.
    pub duration_seconds: i32,
    /// Realised chain length.
    pub chain_duration_seconds: i32,
    /// Person-generation policy.
    pub person_generation: String,
    /// Reference image URLs.
    pub reference_images: Option<Value>,
    /// Opening frame URL.
    pub first_frame_url: Option<String>,
    /// Closing frame URL.
    pub last_frame_url: Option<String>,
    /// Extension source.
    pub source_video_id: Option<uuid::Uuid>,
    /// Credits charged.
    pub credit_cost: i64,
    /// Lifecycle status.
    pub status: String,
    /// Provider operation handle.
    pub operation_id: Option<String>,
    /// Provider video handle.
    pub provider_video_uri: Option<String>,
    /// Storage key.
    pub asset_location: Option<String>,
    /// Stored size.
    pub asset_size_bytes: Option<i64>,
    /// Stored checksum.
    pub asset_sha256: Option<String>,
    /// Failure code.
    pub error_code: Option<String>,
    /// Failure detail.
    pub error_message: Option<String>,
    /// Refund flag.
    pub refunded: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Mutable columns written by state-conditioned updates. `refunded` is
/// deliberately absent.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = generation_tasks)]
#[diesel(treat_none_as_null = true)]
pub struct GenerationTaskChangeset {
    /// Lifecycle status.
    pub status: String,
    /// Provider operation handle.
    pub operation_id: Option<String>,
    /// Provider video handle.
    pub provider_video_uri: Option<String>,
    /// Storage key.
    pub asset_location: Option<String>,
    /// Stored size.
    pub asset_size_bytes: Option<i64>,
    /// Stored checksum.
    pub asset_sha256: Option<String>,
    /// Failure code.
    pub error_code: Option<String>,
    /// Failure detail.
    pub error_message: Option<String>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

fn to_i32(value: u32) -> TaskRepositoryResult<i32> {
    i32::try_from(value).map_err(TaskRepositoryError::persistence)
}

fn to_u32(value: i32) -> TaskRepositoryResult<u32> {
    u32::try_from(value).map_err(TaskRepositoryError::persistence)
}

fn asset_size(asset: Option<&StoredAsset>) -> TaskRepositoryResult<Option<i64>> {
    asset
        .map(|stored| i64::try_from(stored.size_bytes).map_err(TaskRepositoryError::persistence))
        .transpose()
}

/// Maps a task to an insertable row.
pub fn to_row(task: &GenerationTask) -> TaskRepositoryResult<GenerationTaskRow> {
    let (reference_images, first_frame_url, last_frame_url, source_video_id) = match task.mode() {
        GenerationMode::TextToVideo => (None, None, None, None),
        GenerationMode::ReferenceImages { reference_images } => (
            Some(
                serde_json::to_value(reference_images.as_slice())
                    .map_err(TaskRepositoryError::persistence)?,
            ),
            None,
            None,
            None,
        ),
        GenerationMode::FirstLastFrame {
            first_frame_url,
            last_frame_url,
        } => (
            None,
            Some(first_frame_url.clone()),
            Some(last_frame_url.clone()),
            None,
        ),
        GenerationMode::ExtendVideo { source_video_id } => {
            (None, None, None, Some(source_video_id.into_inner()))
        }
    };
    let changes = to_changeset(task)?;

    Ok(GenerationTaskRow {
        id: task.id().into_inner(),
        user_id: task.user_id().into_inner(),
        generation_mode: task.mode().kind().as_str().to_owned(),
        prompt: task.prompt().to_owned(),
        negative_prompt: task.negative_prompt().map(str::to_owned),
        aspect_ratio: task.aspect_ratio().as_str().to_owned(),
        resolution: task.resolution().as_str().to_owned(),
        duration_seconds: to_i32(task.duration())?,
        chain_duration_seconds: to_i32(task.chain_duration())?,
        person_generation: task.person_generation().as_str().to_owned(),
        reference_images,
        first_frame_url,
        last_frame_url,
        source_video_id,
        credit_cost: i64::try_from(task.credit_cost().value())
            .map_err(TaskRepositoryError::persistence)?,
        status: changes.status,
        operation_id: changes.operation_id,
        provider_video_uri: changes.provider_video_uri,
        asset_location: changes.asset_location,
        asset_size_bytes: changes.asset_size_bytes,
        asset_sha256: changes.asset_sha256,
        error_code: changes.error_code,
        error_message: changes.error_message,
        refunded: task.refunded(),
        created_at: task.created_at(),
        updated_at: changes.updated_at,
        completed_at: changes.completed_at,
    })
}

/// Maps the mutable part of a task to a changeset.
pub fn to_changeset(task: &GenerationTask) -> TaskRepositoryResult<GenerationTaskChangeset> {
    let asset = task.asset();
    let failure = task.failure();
    Ok(GenerationTaskChangeset {
        status: task.status().as_str().to_owned(),
        operation_id: task.operation_id().map(|id| id.as_str().to_owned()),
        provider_video_uri: task.provider_video_uri().map(str::to_owned),
        asset_location: asset.map(|stored| stored.location.clone()),
        asset_size_bytes: asset_size(asset)?,
        asset_sha256: asset.map(|stored| stored.sha256.clone()),
        error_code: failure.map(|recorded| recorded.code.clone()),
        error_message: failure.map(|recorded| recorded.message.clone()),
        updated_at: task.updated_at(),
        completed_at: task.completed_at(),
    })
}

fn row_to_mode(row: &GenerationTaskRow) -> TaskRepositoryResult<GenerationMode> {
    let kind = GenerationModeKind::try_from(row.generation_mode.as_str())
        .map_err(TaskRepositoryError::persistence)?;
    let missing = |column: &str| {
        TaskRepositoryError::persistence(std::io::Error::other(format!(
            "task {} in {kind} mode has no {column}",
            row.id
        )))
    };
    match kind {
        GenerationModeKind::TextToVideo => Ok(GenerationMode::TextToVideo),
        GenerationModeKind::ReferenceImages => {
            let value = row
                .reference_images
                .clone()
                .ok_or_else(|| missing("reference_images"))?;
            let reference_images = serde_json::from_value::<ReferenceImages>(value)
                .map_err(TaskRepositoryError::persistence)?;
            Ok(GenerationMode::ReferenceImages { reference_images })
        }
        GenerationModeKind::FirstLastFrame => Ok(GenerationMode::FirstLastFrame {
            first_frame_url: row
                .first_frame_url
                .clone()
                .ok_or_else(|| missing("first_frame_url"))?,
            last_frame_url: row
                .last_frame_url
                .clone()
                .ok_or_else(|| missing("last_frame_url"))?,
        }),
        GenerationModeKind::ExtendVideo => Ok(GenerationMode::ExtendVideo {
            source_video_id: row
                .source_video_id
                .map(GenerationTaskId::from_uuid)
                .ok_or_else(|| missing("source_video_id"))?,
        }),
    }
}

/// Maps a stored row back to the aggregate.
pub fn row_to_task(row: GenerationTaskRow) -> TaskRepositoryResult<GenerationTask> {
    let mode = row_to_mode(&row)?;
    let draft = GenerationDraft {
        user_id: UserId::from_uuid(row.user_id),
        mode,
        prompt: row.prompt,
        negative_prompt: row.negative_prompt,
        aspect_ratio: AspectRatio::try_from(row.aspect_ratio.as_str())
            .map_err(TaskRepositoryError::persistence)?,
        resolution: Resolution::try_from(row.resolution.as_str())
            .map_err(TaskRepositoryError::persistence)?,
        duration: to_u32(row.duration_seconds)?,
        chain_duration: to_u32(row.chain_duration_seconds)?,
        person_generation: PersonGeneration::try_from(row.person_generation.as_str())
            .map_err(TaskRepositoryError::persistence)?,
        credit_cost: u64::try_from(row.credit_cost)
            .map(CreditAmount::new)
            .map_err(TaskRepositoryError::persistence)?,
    };
    let asset = match (row.asset_location, row.asset_size_bytes, row.asset_sha256) {
        (Some(location), Some(size), Some(sha256)) => Some(StoredAsset {
            location,
            size_bytes: u64::try_from(size).map_err(TaskRepositoryError::persistence)?,
            sha256,
        }),
        _ => None,
    };
    let failure = row
        .error_code
        .map(|code| TaskFailure::new(code, row.error_message.unwrap_or_default()));

    Ok(GenerationTask::from_persisted(PersistedGenerationTaskData {
        id: GenerationTaskId::from_uuid(row.id),
        draft,
        status: GenerationStatus::try_from(row.status.as_str())
            .map_err(TaskRepositoryError::persistence)?,
        operation_id: row.operation_id.map(OperationId::new),
        provider_video_uri: row.provider_video_uri,
        asset,
        failure,
        refunded: row.refunded,
        created_at: row.created_at,
        updated_at: row.updated_at,
        completed_at: row.completed_at,
    }))
}
