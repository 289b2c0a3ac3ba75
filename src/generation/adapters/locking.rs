//! Process-local admission gate serialising admissions per user.

use async_trait::async_trait;
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::error;

use crate::credit::{
    domain::{ChargeOutcome, LedgerPosting},
    ports::CreditLedger,
};
use crate::generation::{
    domain::GenerationTask,
    ports::{AdmissionError, AdmissionGate, AdmissionResult, GenerationTaskRepository},
};
use crate::identity::domain::UserId;

/// Admission gate that holds a per-user async lock across count, charge and
/// insert.
///
/// Correct only when every admission for a user goes through the same
/// process; multi-instance deployments use the `PostgreSQL` gate.
pub struct LockingAdmissionGate<C>
where
    C: Clock + Send + Sync,
{
    tasks: Arc<dyn GenerationTaskRepository>,
    ledger: Arc<dyn CreditLedger>,
    clock: Arc<C>,
    user_locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<C> LockingAdmissionGate<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a gate over the given task store and ledger.
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
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, user_id: UserId) -> AdmissionResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .user_locks
            .lock()
            .map_err(|err| AdmissionError::persistence(std::io::Error::other(err.to_string())))?;
        Ok(Arc::clone(locks.entry(user_id).or_default()))
    }

    /// Drops the lock entry for `user_id` once no admission holds it.
    fn release(&self, user_id: UserId, user_lock: Arc<tokio::sync::Mutex<()>>) {
        drop(user_lock);
        let Ok(mut locks) = self.user_locks.lock() else {
            return;
        };
        if locks
            .get(&user_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&user_id);
        }
    }

    /// Number of users with a lock entry, i.e. with an admission in flight.
    #[must_use]
    pub fn tracked_users(&self) -> usize {
        self.user_locks.lock().map_or(0, |locks| locks.len())
    }

    async fn admit_locked(
        &self,
        task: &GenerationTask,
        concurrency_limit: u32,
    ) -> AdmissionResult<()> {
        let active = self.tasks.count_active_for_user(task.user_id()).await?;
        if u32::try_from(active).unwrap_or(u32::MAX) >= concurrency_limit {
            return Err(AdmissionError::ConcurrentLimitExceeded {
                limit: concurrency_limit,
                active,
            });
        }

        let posting = LedgerPosting::new(
            task.user_id(),
            task.id(),
            task.credit_cost(),
            &*self.clock,
        );
        if let ChargeOutcome::Insufficient { available } = self.ledger.charge(&posting).await? {
            return Err(AdmissionError::InsufficientCredits {
                required: task.credit_cost(),
                available,
            });
        }

        if let Err(store_error) = self.tasks.store(task).await {
            if let Err(refund_error) = self.ledger.refund(&posting).await {
                error!(
                    task_id = %task.id(),
                    user_id = %task.user_id(),
                    error = %refund_error,
                    "failed to release charge after task insert failed"
                );
            }
            return Err(store_error.into());
        }
        Ok(())
    }
}

#[async_trait]
impl<C> AdmissionGate for LockingAdmissionGate<C>
where
    C: Clock + Send + Sync,
{
    async fn admit(&self, task: &GenerationTask, concurrency_limit: u32) -> AdmissionResult<()> {
        let user_lock = self.lock_for(task.user_id())?;
        let outcome = {
            let _held = user_lock.lock().await;
            self.admit_locked(task, concurrency_limit).await
        };
        self.release(task.user_id(), user_lock);
        outcome
    }
}
