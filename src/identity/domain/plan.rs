//! Subscription tiers and the concurrency entitlement each grants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subscription tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// Entry tier; also applied to accounts without an active subscription.
    #[default]
    Basic,
    /// Mid tier.
    Pro,
    /// Highest tier.
    Max,
}

impl PlanTier {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Max => "max",
        }
    }

    /// Number of generation tasks the tier may hold in a non-terminal state
    /// at the same time.
    #[must_use]
    pub const fn concurrency_limit(self) -> u32 {
        match self {
            Self::Basic => 1,
            Self::Pro => 2,
            Self::Max => 3,
        }
    }
}

impl TryFrom<&str> for PlanTier {
    type Error = ParsePlanTierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "pro" => Ok(Self::Pro),
            "max" => Ok(Self::Max),
            _ => Err(ParsePlanTierError(value.to_owned())),
        }
    }
}

/// Error returned while parsing a plan tier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown plan tier: {0}")]
pub struct ParsePlanTierError(pub String);
