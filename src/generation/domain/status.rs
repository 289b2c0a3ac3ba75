//! Task lifecycle status and the legal transitions between statuses.

use super::ParseGenerationStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Admitted and charged; provider submission not yet recorded.
    Pending,
    /// Accepted by the provider.
    Processing,
    /// Provider finished; the result asset is being transferred.
    Downloading,
    /// Result asset stored.
    Completed,
    /// Unrecoverable error at any stage.
    Failed,
    /// Cancelled by the owner before download.
    Cancelled,
}

impl GenerationStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Downloading,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Statuses that occupy a concurrency slot.
    pub const ACTIVE: [Self; 3] = [Self::Pending, Self::Processing, Self::Downloading];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the task counts against the owner's concurrency limit.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Whether the owner may still cancel the task.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Returns whether moving from `self` to `target` is a forward step of
    /// the lifecycle.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Processing | Self::Failed | Self::Cancelled)
                | (Self::Processing, Self::Downloading | Self::Failed | Self::Cancelled)
                | (Self::Downloading, Self::Completed | Self::Failed)
        )
    }
}

impl TryFrom<&str> for GenerationStatus {
    type Error = ParseGenerationStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "downloading" => Ok(Self::Downloading),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseGenerationStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
