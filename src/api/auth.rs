//! Bearer-token authentication of callers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use super::{ApiError, AppState};
use crate::generation::services::OrchestrationError;
use crate::identity::domain::{UserId, UserRegion};

/// Header carrying the caller's region code.
pub const REGION_HEADER: &str = "x-user-region";

/// Authenticated caller of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Account the token was issued for.
    pub user_id: UserId,
    /// Region reported by the edge, if any.
    pub region: Option<UserRegion>,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthenticated)?;
        let user_id = state
            .identity
            .verify(token)
            .await
            .map_err(OrchestrationError::from)?
            .ok_or_else(|| {
                debug!("rejected unknown bearer token");
                ApiError::Unauthenticated
            })?;
        let region = parts
            .headers
            .get(REGION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(UserRegion::new);
        Ok(Self { user_id, region })
    }
}
