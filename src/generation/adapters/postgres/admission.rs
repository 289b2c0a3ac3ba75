//! Transactional admission against the shared database.

use super::{
    models::to_row,
    repository::{GenerationPgPool, count_active, insert_task},
};
use crate::credit::{
    adapters::postgres::{charge_in, lock_balance},
    domain::{ChargeOutcome, LedgerPosting},
};
use crate::generation::{
    domain::GenerationTask,
    ports::{AdmissionError, AdmissionGate, AdmissionResult},
};
use async_trait::async_trait;
use diesel::Connection;
use mockable::Clock;
use std::sync::Arc;

/// Admission gate that runs count, charge and insert in one transaction.
///
/// The owner's credit account row is locked first, so concurrent admissions
/// for the same user serialise even across processes.
pub struct PostgresAdmissionGate<C>
where
    C: Clock + Send + Sync,
{
    pool: GenerationPgPool,
    clock: Arc<C>,
}

impl<C> PostgresAdmissionGate<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a gate from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: GenerationPgPool, clock: Arc<C>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl<C> AdmissionGate for PostgresAdmissionGate<C>
where
    C: Clock + Send + Sync,
{
    async fn admit(&self, task: &GenerationTask, concurrency_limit: u32) -> AdmissionResult<()> {
        let row = to_row(task)?;
        let posting = LedgerPosting::new(
            task.user_id(),
            task.id(),
            task.credit_cost(),
            &*self.clock,
        );
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(AdmissionError::persistence)?;
            connection.transaction::<_, AdmissionError, _>(|tx| {
                lock_balance(tx, posting.user_id)?;
                let active = count_active(tx, posting.user_id)?;
                if u32::try_from(active).unwrap_or(u32::MAX) >= concurrency_limit {
                    return Err(AdmissionError::ConcurrentLimitExceeded {
                        limit: concurrency_limit,
                        active,
                    });
                }
                if let ChargeOutcome::Insufficient { available } = charge_in(tx, &posting)? {
                    return Err(AdmissionError::InsufficientCredits {
                        required: posting.amount,
                        available,
                    });
                }
                insert_task(tx, &row)?;
                Ok(())
            })
        })
        .await
        .map_err(AdmissionError::persistence)?
    }
}
