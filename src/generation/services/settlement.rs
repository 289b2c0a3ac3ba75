//! Idempotent return of a task's charge.

use crate::credit::{
    domain::{LedgerPosting, RefundOutcome},
    ports::{CreditLedger, LedgerError},
};
use crate::generation::{domain::GenerationTask, ports::GenerationTaskRepository};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a settlement attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Credits were returned by this call.
    Refunded,
    /// An earlier call already returned them.
    AlreadySettled,
    /// The task is past the point where a refund applies.
    NotEligible,
    /// The ledger failed; left for reconciliation.
    Deferred,
}

/// Returns charges for failed or cancelled tasks exactly once.
///
/// The ledger's one-refund-per-task rule is authoritative; the task's
/// `refunded` flag mirrors it for readers. Failures are logged and never
/// surface to the caller.
pub struct CreditSettlement<C>
where
    C: Clock + Send + Sync,
{
    tasks: Arc<dyn GenerationTaskRepository>,
    ledger: Arc<dyn CreditLedger>,
    clock: Arc<C>,
}

impl<C> Clone for CreditSettlement<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
            ledger: Arc::clone(&self.ledger),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C> CreditSettlement<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a settlement helper.
    #[must_use]
    pub fn new(
        tasks: Arc<dyn GenerationTaskRepository>,
        ledger: Arc<dyn CreditLedger>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            tasks,
            ledger,
            clock,
        }
    }

    /// Refunds `task` if it is still eligible, updating its flag in place.
    pub async fn refund(&self, task: &mut GenerationTask) -> SettlementOutcome {
        if !task.is_refund_eligible() {
            return if task.refunded() {
                SettlementOutcome::AlreadySettled
            } else {
                SettlementOutcome::NotEligible
            };
        }

        let posting = LedgerPosting::new(
            task.user_id(),
            task.id(),
            task.credit_cost(),
            &*self.clock,
        );
        let outcome = match self.ledger.refund(&posting).await {
            Ok(RefundOutcome::Refunded) => {
                info!(
                    task_id = %task.id(),
                    user_id = %task.user_id(),
                    amount = %task.credit_cost(),
                    "refunded task charge"
                );
                SettlementOutcome::Refunded
            }
            Ok(RefundOutcome::AlreadyRefunded) => {
                debug!(task_id = %task.id(), "charge already refunded");
                SettlementOutcome::AlreadySettled
            }
            Err(LedgerError::ChargeNotFound(task_id)) => {
                warn!(%task_id, "no charge recorded for task; nothing to refund");
                return SettlementOutcome::NotEligible;
            }
            Err(err) => {
                error!(
                    task_id = %task.id(),
                    user_id = %task.user_id(),
                    error = %err,
                    "refund failed; left for reconciliation"
                );
                return SettlementOutcome::Deferred;
            }
        };

        match self.tasks.mark_refunded(task.id()).await {
            Ok(_) => task.mark_refunded(),
            Err(err) => error!(
                task_id = %task.id(),
                error = %err,
                "failed to flag task as refunded"
            ),
        }
        outcome
    }
}
