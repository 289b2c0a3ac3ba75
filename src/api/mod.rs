//! HTTP surface.
//!
//! Routes:
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | `GET` | `/health` | liveness |
//! | `POST` | `/v1/video/generate` | create a task |
//! | `POST` | `/v1/video/extend` | extend a completed video |
//! | `GET` | `/v1/video/tasks` | list the caller's tasks |
//! | `GET` | `/v1/video/tasks/{id}` | read one task |
//! | `POST` | `/v1/video/tasks/{id}/cancel` | cancel a task |
//! | `GET` | `/v1/stats/video-generation` | outcome statistics |
//!
//! Every route except `/health` requires `Authorization: Bearer <token>`.

mod auth;
pub mod dto;
mod error;
mod handlers;
mod state;

pub use auth::{Caller, REGION_HEADER};
pub use error::{ApiError, ErrorBody};
pub use state::AppState;

use axum::Router;
use axum::routing::{get, post};

/// Builds the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    let video = Router::new()
        .route("/generate", post(handlers::generate))
        .route("/extend", post(handlers::extend))
        .route("/tasks", get(handlers::list_tasks))
        .route("/tasks/{id}", get(handlers::get_task))
        .route("/tasks/{id}/cancel", post(handlers::cancel_task));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/v1/video", video)
        .route(
            "/v1/stats/video-generation",
            get(handlers::generation_stats),
        )
        .with_state(state)
}
