//! Request handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use serde_json::{Value, json};
use tracing::info;

use super::dto::{
    ExtendVideoBody, GenerationAccepted, ListTasksParams, StatsParams, TaskListResponse, TaskView,
};
use super::{ApiError, AppState, Caller};
use crate::generation::{
    domain::{GenerationStatus, GenerationTaskId},
    ports::TaskQuery,
    services::{ExtensionRequest, GenerationStats, OrchestrationError, StatsWindow},
    validation::{CreateGenerationRequest, ValidationCode, ValidationError},
};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn decode<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))
}

fn task_id(raw: &str) -> Result<GenerationTaskId, ApiError> {
    raw.parse::<GenerationTaskId>()
        .map_err(|_| ApiError::MalformedTaskId(raw.to_owned()))
}

/// `GET /health`
#[expect(clippy::unused_async, reason = "axum handlers are futures")]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// `POST /v1/video/generate`
pub async fn generate(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CreateGenerationRequest>, JsonRejection>,
) -> ApiResult<GenerationAccepted> {
    let request = decode(payload)?;
    let task = state
        .generation
        .create(caller.user_id, &request, caller.region.as_ref())
        .await?;
    info!(task_id = %task.id(), user_id = %caller.user_id, "generation accepted");
    Ok(Json(GenerationAccepted::from(&task)))
}

/// `POST /v1/video/extend`
pub async fn extend(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<ExtendVideoBody>, JsonRejection>,
) -> ApiResult<GenerationAccepted> {
    let body = decode(payload)?;
    let raw_source = body
        .source_video_id
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| {
            OrchestrationError::from(ValidationError::new(
                ValidationCode::MissingSourceVideoId,
                "source_video_id",
                "source_video_id is required",
            ))
        })?;
    let source_video_id = raw_source.parse::<GenerationTaskId>().map_err(|_| {
        OrchestrationError::from(ValidationError::new(
            ValidationCode::InvalidSourceVideoId,
            "source_video_id",
            format!("source_video_id '{raw_source}' is not a task identifier"),
        ))
    })?;
    let request = ExtensionRequest {
        source_video_id,
        prompt: body.prompt.unwrap_or_default(),
        person_generation: body.person_generation,
    };

    let task = state
        .generation
        .extend(caller.user_id, request, caller.region.as_ref())
        .await?;
    info!(
        task_id = %task.id(),
        %source_video_id,
        user_id = %caller.user_id,
        "extension accepted"
    );
    Ok(Json(GenerationAccepted::from(&task)))
}

/// `GET /v1/video/tasks`
pub async fn list_tasks(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListTasksParams>,
) -> ApiResult<TaskListResponse> {
    let status = params
        .status
        .as_deref()
        .map(GenerationStatus::try_from)
        .transpose()
        .map_err(|err| ApiError::InvalidQuery {
            field: "status",
            message: err.to_string(),
        })?;
    let query = TaskQuery::new(status, params.limit, params.offset);
    let page = state.generation.list(caller.user_id, query).await?;
    Ok(Json(TaskListResponse::from_page(
        &page,
        query.limit,
        query.offset,
    )))
}

/// `GET /v1/video/tasks/{id}`
pub async fn get_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<TaskView> {
    let task = state.generation.get(caller.user_id, task_id(&id)?).await?;
    Ok(Json(TaskView::from(&task)))
}

/// `POST /v1/video/tasks/{id}/cancel`
pub async fn cancel_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<TaskView> {
    let task = state.generation.cancel(caller.user_id, task_id(&id)?).await?;
    Ok(Json(TaskView::from(&task)))
}

/// `GET /v1/stats/video-generation`
pub async fn generation_stats(
    State(state): State<AppState>,
    _caller: Caller,
    Query(params): Query<StatsParams>,
) -> ApiResult<GenerationStats> {
    let window = params
        .window
        .as_deref()
        .map(StatsWindow::try_from)
        .transpose()
        .map_err(|err| ApiError::InvalidQuery {
            field: "window",
            message: err.to_string(),
        })?
        .unwrap_or_default();
    Ok(Json(state.stats.snapshot(window).await?))
}
