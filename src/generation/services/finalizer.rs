//! Background progress tracking and finalisation.
//!
//! Every write is conditioned on the status the finalizer read, so
//! concurrent ticks (in one process or many) can observe the same provider
//! signal without finalising a task twice or moving it backwards.

use super::{CreditSettlement, GenerationPorts, OrchestrationError, OrchestrationResult};
use crate::generation::{
    domain::{
        GenerationStatus, GenerationTask, OperationId, PERSISTENCE_ERROR, PROVIDER_ERROR,
        SUBMISSION_ORPHANED, TIMEOUT, TaskFailure,
    },
    ports::{OperationStatus, TaskRepositoryError},
};
use chrono::TimeDelta;
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Result of examining one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Nothing to do yet.
    Unchanged(GenerationStatus),
    /// The task moved to this status.
    Advanced(GenerationStatus),
    /// The task was already terminal.
    AlreadyFinal(GenerationStatus),
    /// Another writer changed the task first.
    Superseded,
}

/// Counts from one pass over the active tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks examined.
    pub examined: usize,
    /// Tasks that reached `completed`.
    pub completed: usize,
    /// Tasks that reached `failed`.
    pub failed: usize,
    /// Tasks that moved to `downloading` but are not yet stored.
    pub downloading: usize,
    /// Tasks examined without change.
    pub unchanged: usize,
    /// Tasks whose examination errored.
    pub errors: usize,
}

/// Advances processing and downloading tasks by consulting the provider.
pub struct GenerationFinalizer<C>
where
    C: Clock + Send + Sync,
{
    ports: GenerationPorts,
    settlement: CreditSettlement<C>,
    clock: Arc<C>,
    task_max_age: TimeDelta,
}

impl<C> GenerationFinalizer<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a finalizer failing tasks older than `task_max_age`.
    #[must_use]
    pub fn new(ports: GenerationPorts, clock: Arc<C>, task_max_age: Duration) -> Self {
        let settlement = CreditSettlement::new(
            Arc::clone(&ports.tasks),
            Arc::clone(&ports.ledger),
            Arc::clone(&clock),
        );
        Self {
            ports,
            settlement,
            clock,
            task_max_age: TimeDelta::from_std(task_max_age).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Examines every active task once.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Persistence`] when active tasks cannot
    /// be listed. Per-task failures are counted, not returned.
    pub async fn tick(&self) -> OrchestrationResult<TickReport> {
        let active = self
            .ports
            .tasks
            .list_by_status(&GenerationStatus::ACTIVE)
            .await?;
        let mut report = TickReport::default();
        for task in active {
            report.examined += 1;
            let task_id = task.id();
            match self.finalize_task(task).await {
                Ok(FinalizeOutcome::Advanced(GenerationStatus::Completed)) => {
                    report.completed += 1;
                }
                Ok(FinalizeOutcome::Advanced(GenerationStatus::Failed)) => report.failed += 1,
                Ok(FinalizeOutcome::Advanced(_)) => report.downloading += 1,
                Ok(
                    FinalizeOutcome::Unchanged(_)
                    | FinalizeOutcome::AlreadyFinal(_)
                    | FinalizeOutcome::Superseded,
                ) => report.unchanged += 1,
                Err(err) => {
                    report.errors += 1;
                    warn!(%task_id, error = %err, "finalizer could not examine task");
                }
            }
        }
        debug!(?report, "finalizer tick");
        Ok(report)
    }

    /// Examines the task tracking `operation_id`.
    ///
    /// Safe to call any number of times; a terminal task is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Persistence`] when the store fails and
    /// [`OrchestrationError::UnknownOperation`] when no task tracks the
    /// operation.
    pub async fn finalize_operation(
        &self,
        operation_id: &OperationId,
    ) -> OrchestrationResult<FinalizeOutcome> {
        let task = self
            .ports
            .tasks
            .find_by_operation_id(operation_id)
            .await?
            .ok_or_else(|| OrchestrationError::UnknownOperation(operation_id.clone()))?;
        self.finalize_task(task).await
    }

    /// Ticks every `interval` until `shutdown` resolves.
    pub async fn run(&self, interval: Duration, shutdown: impl Future<Output = ()> + Send) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        info!(interval_secs = interval.as_secs(), "finalizer started");
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "finalizer tick failed");
                    }
                }
            }
        }
        info!("finalizer stopped");
    }

    async fn finalize_task(&self, task: GenerationTask) -> OrchestrationResult<FinalizeOutcome> {
        match task.status() {
            GenerationStatus::Pending => self.check_orphaned(task).await,
            GenerationStatus::Processing => self.poll(task).await,
            GenerationStatus::Downloading => self.store_result(task).await,
            status @ (GenerationStatus::Completed
            | GenerationStatus::Failed
            | GenerationStatus::Cancelled) => Ok(FinalizeOutcome::AlreadyFinal(status)),
        }
    }

    fn is_expired(&self, task: &GenerationTask) -> bool {
        self.clock.utc() - task.created_at() > self.task_max_age
    }

    async fn check_orphaned(&self, task: GenerationTask) -> OrchestrationResult<FinalizeOutcome> {
        if !self.is_expired(&task) {
            return Ok(FinalizeOutcome::Unchanged(GenerationStatus::Pending));
        }
        self.fail(
            task,
            TaskFailure::new(
                SUBMISSION_ORPHANED,
                "provider submission was never recorded",
            ),
        )
        .await
    }

    async fn poll(&self, task: GenerationTask) -> OrchestrationResult<FinalizeOutcome> {
        let Some(operation_id) = task.operation_id().cloned() else {
            return self.check_orphaned_processing(task).await;
        };
        let status = match self.ports.provider.poll_status(&operation_id).await {
            Ok(status) => status,
            Err(err) if self.is_expired(&task) => {
                return self
                    .fail(task, TaskFailure::new(TIMEOUT, format!("provider unreachable: {err}")))
                    .await;
            }
            Err(err) => {
                warn!(task_id = %task.id(), %operation_id, error = %err, "status poll failed");
                return Ok(FinalizeOutcome::Unchanged(GenerationStatus::Processing));
            }
        };

        match status {
            OperationStatus::Queued | OperationStatus::Running if self.is_expired(&task) => {
                self.fail(
                    task,
                    TaskFailure::new(TIMEOUT, "generation did not finish in time"),
                )
                .await
            }
            OperationStatus::Queued | OperationStatus::Running => {
                Ok(FinalizeOutcome::Unchanged(GenerationStatus::Processing))
            }
            OperationStatus::Error { code, message } => {
                let failure_code = code.unwrap_or_else(|| PROVIDER_ERROR.to_owned());
                self.fail(task, TaskFailure::new(failure_code, message)).await
            }
            OperationStatus::Done { result_uri } => self.begin_download(task, result_uri).await,
        }
    }

    async fn check_orphaned_processing(
        &self,
        task: GenerationTask,
    ) -> OrchestrationResult<FinalizeOutcome> {
        error!(task_id = %task.id(), "processing task has no operation handle");
        self.fail(
            task,
            TaskFailure::new(SUBMISSION_ORPHANED, "no provider operation recorded"),
        )
        .await
    }

    async fn begin_download(
        &self,
        mut task: GenerationTask,
        result_uri: String,
    ) -> OrchestrationResult<FinalizeOutcome> {
        task.mark_downloading(result_uri, &*self.clock)?;
        match self
            .ports
            .tasks
            .update_if_status(&task, GenerationStatus::Processing)
            .await
        {
            Ok(()) => {}
            Err(TaskRepositoryError::StatusConflict { .. }) => {
                return Ok(FinalizeOutcome::Superseded);
            }
            Err(err) => return Err(err.into()),
        }
        info!(task_id = %task.id(), "provider finished; downloading result");

        match self.store_result(task).await? {
            FinalizeOutcome::Unchanged(_) => {
                Ok(FinalizeOutcome::Advanced(GenerationStatus::Downloading))
            }
            other => Ok(other),
        }
    }

    async fn store_result(&self, mut task: GenerationTask) -> OrchestrationResult<FinalizeOutcome> {
        let Some(result_uri) = task.provider_video_uri().map(str::to_owned) else {
            return self
                .fail(
                    task,
                    TaskFailure::new(PERSISTENCE_ERROR, "no provider result to download"),
                )
                .await;
        };

        let stored = match self.ports.provider.fetch_result(&result_uri).await {
            Ok(bytes) => self
                .ports
                .assets
                .put(task.user_id(), task.id(), &bytes)
                .await
                .map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        let asset = match stored {
            Ok(asset) => asset,
            Err(reason) if self.is_expired(&task) => {
                return self
                    .fail(task, TaskFailure::new(PERSISTENCE_ERROR, reason))
                    .await;
            }
            Err(reason) => {
                warn!(task_id = %task.id(), error = %reason, "result not stored yet; will retry");
                return Ok(FinalizeOutcome::Unchanged(GenerationStatus::Downloading));
            }
        };

        task.mark_completed(asset, &*self.clock)?;
        match self
            .ports
            .tasks
            .update_if_status(&task, GenerationStatus::Downloading)
            .await
        {
            Ok(()) => {
                info!(
                    task_id = %task.id(),
                    user_id = %task.user_id(),
                    latency_secs = task.latency_seconds(),
                    "task completed"
                );
                Ok(FinalizeOutcome::Advanced(GenerationStatus::Completed))
            }
            Err(TaskRepositoryError::StatusConflict { .. }) => Ok(FinalizeOutcome::Superseded),
            Err(err) => Err(err.into()),
        }
    }

    /// Fails `task` if it is still in the status it was read in, then
    /// settles its charge.
    async fn fail(
        &self,
        mut task: GenerationTask,
        failure: TaskFailure,
    ) -> OrchestrationResult<FinalizeOutcome> {
        let expected = task.status();
        info!(
            task_id = %task.id(),
            code = %failure.code,
            message = %failure.message,
            "failing task"
        );
        task.mark_failed(failure, &*self.clock)?;
        match self.ports.tasks.update_if_status(&task, expected).await {
            Ok(()) => {}
            Err(TaskRepositoryError::StatusConflict { .. }) => {
                return Ok(FinalizeOutcome::Superseded);
            }
            Err(err) => return Err(err.into()),
        }
        self.settlement.refund(&mut task).await;
        Ok(FinalizeOutcome::Advanced(GenerationStatus::Failed))
    }
}
