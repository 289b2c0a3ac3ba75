//! Identity verification and plan lookup ports.

use crate::identity::domain::{PlanTier, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Verifies bearer credentials issued by the external identity service.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolves a bearer token to the account it was issued for.
    ///
    /// Returns `None` when the token is unknown or expired.
    async fn verify(&self, token: &str) -> IdentityResult<Option<UserId>>;
}

/// Resolves the subscription tier that governs an account's concurrency.
#[async_trait]
pub trait PlanDirectory: Send + Sync {
    /// Returns the active plan for a user, falling back to
    /// [`PlanTier::Basic`] when the user has no subscription.
    async fn plan_for(&self, user_id: UserId) -> IdentityResult<PlanTier>;
}

/// Errors returned by identity adapters.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// The backing identity service failed.
    #[error("identity service error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl IdentityError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
