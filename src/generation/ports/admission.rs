//! Admission port: concurrency check, charge and insert as one step.

use crate::credit::domain::CreditAmount;
use crate::credit::ports::LedgerError;
use crate::generation::domain::GenerationTask;
use crate::generation::ports::TaskRepositoryError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for admission.
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Atomically admits a pending task.
///
/// Implementations count the owner's active tasks, debit the task's credit
/// cost and insert the task so that concurrent admissions for the same user
/// cannot both observe the same free slot or the same balance.
#[async_trait]
pub trait AdmissionGate: Send + Sync {
    /// Admits `task` if the owner has a free slot under `concurrency_limit`
    /// and enough credits.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::ConcurrentLimitExceeded`] without charging,
    /// or [`AdmissionError::InsufficientCredits`] without storing the task.
    async fn admit(&self, task: &GenerationTask, concurrency_limit: u32) -> AdmissionResult<()>;
}

/// Admission failures.
#[derive(Debug, Clone, Error)]
pub enum AdmissionError {
    /// Every concurrency slot is occupied.
    #[error("concurrent task limit reached: {active} of {limit} slots in use")]
    ConcurrentLimitExceeded {
        /// Plan limit.
        limit: u32,
        /// Active tasks observed.
        active: usize,
    },

    /// The balance does not cover the task.
    #[error("insufficient credits: {required} required, {available} available")]
    InsufficientCredits {
        /// Task cost.
        required: CreditAmount,
        /// Balance observed.
        available: CreditAmount,
    },

    /// The ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The task store failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),

    /// The backing transaction failed.
    #[error("admission transaction failed: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AdmissionError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
