//! Ledger port: atomic conditional debit and idempotent refund.

use crate::credit::domain::{
    ChargeOutcome, CreditAmount, CreditTransaction, LedgerPosting, RefundOutcome,
};
use crate::generation::domain::GenerationTaskId;
use crate::identity::domain::UserId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Credit ledger contract.
///
/// Implementations must make [`CreditLedger::charge`] and
/// [`CreditLedger::refund`] atomic with respect to other mutations of the
/// same balance.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Returns the current balance; accounts never credited report zero.
    async fn balance(&self, user_id: UserId) -> LedgerResult<CreditAmount>;

    /// Debits the posting amount if the balance covers it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateCharge`] when the task already has a
    /// charge entry.
    async fn charge(&self, posting: &LedgerPosting) -> LedgerResult<ChargeOutcome>;

    /// Returns the posting amount to the balance once per task.
    ///
    /// A second refund for the same task reports
    /// [`RefundOutcome::AlreadyRefunded`] without touching the balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ChargeNotFound`] when the task was never
    /// charged.
    async fn refund(&self, posting: &LedgerPosting) -> LedgerResult<RefundOutcome>;

    /// Lists the entries recorded for a task, oldest first.
    async fn transactions_for_task(
        &self,
        task_id: GenerationTaskId,
    ) -> LedgerResult<Vec<CreditTransaction>>;
}

/// Errors returned by ledger implementations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The task already carries a charge.
    #[error("task {0} has already been charged")]
    DuplicateCharge(GenerationTaskId),

    /// A refund was requested for a task that was never charged.
    #[error("task {0} has no charge to refund")]
    ChargeNotFound(GenerationTaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
