//! Static token table standing in for the external identity service.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::identity::{
    domain::{PlanTier, UserId},
    ports::{IdentityResult, IdentityVerifier, PlanDirectory},
};

/// Identity directory backed by a fixed token table.
///
/// Used by tests and by single-node deployments where API tokens are
/// provisioned through configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityDirectory {
    tokens: HashMap<String, UserId>,
    plans: HashMap<UserId, PlanTier>,
}

/// Error returned for a malformed `token=user:plan` entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid token entry '{entry}': {reason}")]
pub struct ParseTokenEntryError {
    /// Offending entry.
    pub entry: String,
    /// Why the entry was rejected.
    pub reason: String,
}

impl StaticIdentityDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for a user.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, user_id: UserId) -> Self {
        self.tokens.insert(token.into(), user_id);
        self
    }

    /// Assigns a plan tier to a user.
    #[must_use]
    pub fn with_plan(mut self, user_id: UserId, plan: PlanTier) -> Self {
        self.plans.insert(user_id, plan);
        self
    }

    /// Parses a comma-separated list of `token=user-uuid[:plan]` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ParseTokenEntryError`] for the first malformed entry.
    pub fn parse(entries: &str) -> Result<Self, ParseTokenEntryError> {
        entries.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .try_fold(Self::new(), |directory, entry| {
                let reject = |reason: &str| ParseTokenEntryError {
                    entry: entry.to_owned(),
                    reason: reason.to_owned(),
                };
                let (token, account) = entry
                    .split_once('=')
                    .ok_or_else(|| reject("expected token=user"))?;
                let (user, plan) = account.split_once(':').unwrap_or((account, "basic"));
                if token.trim().is_empty() {
                    return Err(reject("token must not be empty"));
                }
                let user_id = user
                    .parse::<UserId>()
                    .map_err(|err| reject(&err.to_string()))?;
                let tier = PlanTier::try_from(plan).map_err(|err| reject(&err.to_string()))?;
                Ok(directory
                    .with_token(token.trim(), user_id)
                    .with_plan(user_id, tier))
            })
    }

    /// Number of registered tokens.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Distinct users with at least one token.
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.plans.keys().copied()
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityDirectory {
    async fn verify(&self, token: &str) -> IdentityResult<Option<UserId>> {
        Ok(self.tokens.get(token.trim()).copied())
    }
}

#[async_trait]
impl PlanDirectory for StaticIdentityDirectory {
    async fn plan_for(&self, user_id: UserId) -> IdentityResult<PlanTier> {
        Ok(self.plans.get(&user_id).copied().unwrap_or_default())
    }
}
