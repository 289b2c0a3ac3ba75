//! Ledger entries and the outcomes of balance mutations.

use super::CreditAmount;
use crate::generation::domain::GenerationTaskId;
use crate::identity::domain::UserId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credits debited when a task is admitted.
    Charge,
    /// Credits returned after a task failed or was cancelled.
    Refund,
}

impl TransactionKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Refund => "refund",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = ParseTransactionKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "charge" => Ok(Self::Charge),
            "refund" => Ok(Self::Refund),
            _ => Err(ParseTransactionKindError(value.to_owned())),
        }
    }
}

/// Error returned while parsing a transaction kind from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown credit transaction kind: {0}")]
pub struct ParseTransactionKindError(pub String);

/// Balance mutation requested against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPosting {
    /// Account whose balance changes.
    pub user_id: UserId,
    /// Task the credits are held for.
    pub task_id: GenerationTaskId,
    /// Number of credits moved.
    pub amount: CreditAmount,
    /// When the posting was requested.
    pub recorded_at: DateTime<Utc>,
}

impl LedgerPosting {
    /// Builds a posting stamped with the current clock time.
    #[must_use]
    pub fn new(
        user_id: UserId,
        task_id: GenerationTaskId,
        amount: CreditAmount,
        clock: &impl Clock,
    ) -> Self {
        Self {
            user_id,
            task_id,
            amount,
            recorded_at: clock.utc(),
        }
    }
}

/// Recorded ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    id: Uuid,
    kind: TransactionKind,
    user_id: UserId,
    task_id: GenerationTaskId,
    amount: CreditAmount,
    created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Records a posting as a new ledger entry.
    #[must_use]
    pub fn record(kind: TransactionKind, posting: &LedgerPosting) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            user_id: posting.user_id,
            task_id: posting.task_id,
            amount: posting.amount,
            created_at: posting.recorded_at,
        }
    }

    /// Reconstructs a ledger entry from storage.
    #[must_use]
    pub const fn from_persisted(
        id: Uuid,
        kind: TransactionKind,
        posting: LedgerPosting,
    ) -> Self {
        Self {
            id,
            kind,
            user_id: posting.user_id,
            task_id: posting.task_id,
            amount: posting.amount,
            created_at: posting.recorded_at,
        }
    }

    /// Returns the entry identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns whether the entry debits or credits the account.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns the account the entry belongs to.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the task the entry was recorded for.
    #[must_use]
    pub const fn task_id(&self) -> GenerationTaskId {
        self.task_id
    }

    /// Returns the number of credits moved.
    #[must_use]
    pub const fn amount(&self) -> CreditAmount {
        self.amount
    }

    /// Returns when the entry was recorded.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Result of a conditional debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// The balance covered the amount and was debited.
    Charged {
        /// Balance left after the debit.
        remaining: CreditAmount,
    },
    /// The balance did not cover the amount; nothing changed.
    Insufficient {
        /// Balance at the time of the attempt.
        available: CreditAmount,
    },
}

/// Result of a refund attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundOutcome {
    /// The amount was returned to the balance.
    Refunded,
    /// A refund had already been recorded for the task.
    AlreadyRefunded,
}
