//! Admission followed by provider submission.

use super::{CreditSettlement, GenerationPorts, OrchestrationError, OrchestrationResult};
use crate::generation::{
    domain::{GenerationStatus, GenerationTask, OperationId, TaskFailure},
    ports::{ProviderError, ProviderSubmission, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Admits a pending task and hands it to the provider.
///
/// A submission that fails or times out marks the task `failed` and
/// returns the charge before the error reaches the caller.
pub struct AdmissionController<C>
where
    C: Clock + Send + Sync,
{
    ports: GenerationPorts,
    settlement: CreditSettlement<C>,
    clock: Arc<C>,
    submit_timeout: Duration,
    charge_timeout: Duration,
}

impl<C> AdmissionController<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a controller.
    #[must_use]
    pub fn new(
        ports: GenerationPorts,
        clock: Arc<C>,
        submit_timeout: Duration,
        charge_timeout: Duration,
    ) -> Self {
        let settlement = CreditSettlement::new(
            Arc::clone(&ports.tasks),
            Arc::clone(&ports.ledger),
            Arc::clone(&clock),
        );
        Self {
            ports,
            settlement,
            clock,
            submit_timeout,
            charge_timeout,
        }
    }

    /// Admits `task` under its owner's plan limit, then submits it.
    ///
    /// Returns the task in `processing` with its operation handle recorded,
    /// or the stored task as-is when it left `pending` (for example through
    /// cancellation) while the provider call was in flight.
    ///
    /// # Errors
    ///
    /// Returns an admission error with nothing charged or stored,
    /// [`OrchestrationError::ChargeTimeout`] when the gate does not answer
    /// in time, or [`OrchestrationError::Provider`] after the task was
    /// failed and refunded.
    pub async fn admit_and_submit(
        &self,
        mut task: GenerationTask,
        submission: ProviderSubmission,
    ) -> OrchestrationResult<GenerationTask> {
        let plan = self.ports.plans.plan_for(task.user_id()).await?;
        let admitted = timeout(
            self.charge_timeout,
            self.ports.admission.admit(&task, plan.concurrency_limit()),
        )
        .await
        .map_err(|_| OrchestrationError::ChargeTimeout)?;
        if let Err(err) = admitted {
            info!(
                user_id = %task.user_id(),
                plan = plan.as_str(),
                error = %err,
                "admission rejected"
            );
            return Err(err.into());
        }

        let operation_id = match self.submit(&submission).await {
            Ok(operation_id) => operation_id,
            Err(provider_error) => {
                self.fail_submission(&mut task, &provider_error).await;
                return Err(provider_error.into());
            }
        };

        task.mark_submitted(operation_id.clone(), &*self.clock)?;
        match self
            .ports
            .tasks
            .update_if_status(&task, GenerationStatus::Pending)
            .await
        {
            Ok(()) => {}
            Err(TaskRepositoryError::StatusConflict { actual, .. }) => {
                warn!(
                    task_id = %task.id(),
                    %operation_id,
                    status = %actual,
                    "task left pending during submission; provider job is untracked"
                );
                return self
                    .ports
                    .tasks
                    .find_by_id(task.id())
                    .await?
                    .ok_or(OrchestrationError::TaskNotFound(task.id()));
            }
            Err(err) => {
                error!(
                    task_id = %task.id(),
                    %operation_id,
                    error = %err,
                    "provider accepted the job but the task could not be updated"
                );
                return Err(err.into());
            }
        }
        info!(
            task_id = %task.id(),
            user_id = %task.user_id(),
            %operation_id,
            "task submitted"
        );
        Ok(task)
    }

    async fn submit(&self, submission: &ProviderSubmission) -> Result<OperationId, ProviderError> {
        let call = async {
            match submission {
                ProviderSubmission::Generation(job) => self.ports.provider.submit(job).await,
                ProviderSubmission::Extension(job) => {
                    self.ports.provider.submit_extension(job).await
                }
            }
        };
        timeout(self.submit_timeout, call)
            .await
            .unwrap_or(Err(ProviderError::Timeout))
    }

    async fn fail_submission(&self, task: &mut GenerationTask, cause: &ProviderError) {
        warn!(
            task_id = %task.id(),
            user_id = %task.user_id(),
            error = %cause,
            "provider submission failed"
        );
        let failure = TaskFailure::new(cause.failure_code(), cause.to_string());
        if task.mark_failed(failure, &*self.clock).is_err() {
            return;
        }
        if let Err(err) = self
            .ports
            .tasks
            .update_if_status(task, GenerationStatus::Pending)
            .await
        {
            error!(task_id = %task.id(), error = %err, "failed to record submission failure");
        }
        self.settlement.refund(task).await;
    }
}
