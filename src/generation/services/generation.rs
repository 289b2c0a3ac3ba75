//! Entry points for creating, reading, listing and cancelling tasks.

use super::{
    AdmissionController, CreditSettlement, ExtensionRequest, ExtensionService, GenerationPorts,
    OrchestrationError, OrchestrationResult, OrchestrationSettings,
};
use crate::generation::{
    domain::{GenerationMode, GenerationTask, GenerationTaskId},
    ports::{GenerationSubmission, ProviderSubmission, TaskPage, TaskQuery, TaskRepositoryError},
    validation::{CreateGenerationRequest, validate_generation_request},
};
use crate::identity::domain::{UserId, UserRegion};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

const CANCEL_ATTEMPTS: u32 = 3;

/// Generation task orchestration service.
pub struct GenerationService<C>
where
    C: Clock + Send + Sync,
{
    ports: GenerationPorts,
    admission: Arc<AdmissionController<C>>,
    extension: ExtensionService<C>,
    settlement: CreditSettlement<C>,
    clock: Arc<C>,
}

impl<C> GenerationService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates the service over `ports`.
    #[must_use]
    pub fn new(ports: GenerationPorts, clock: Arc<C>, settings: OrchestrationSettings) -> Self {
        let admission = Arc::new(AdmissionController::new(
            ports.clone(),
            Arc::clone(&clock),
            settings.submit_timeout,
            settings.charge_timeout,
        ));
        let extension = ExtensionService::new(
            Arc::clone(&ports.tasks),
            Arc::clone(&admission),
            Arc::clone(&clock),
        );
        let settlement = CreditSettlement::new(
            Arc::clone(&ports.tasks),
            Arc::clone(&ports.ledger),
            Arc::clone(&clock),
        );
        Self {
            ports,
            admission,
            extension,
            settlement,
            clock,
        }
    }

    /// Validates, admits and submits a creation request.
    ///
    /// `extend-video` requests are routed through the extension rules.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or any admission, lineage or
    /// provider error.
    pub async fn create(
        &self,
        user_id: UserId,
        request: &CreateGenerationRequest,
        region: Option<&UserRegion>,
    ) -> OrchestrationResult<GenerationTask> {
        let validated = validate_generation_request(request, region)?;
        if let GenerationMode::ExtendVideo { source_video_id } = validated.mode {
            return self
                .extension
                .extend(
                    user_id,
                    ExtensionRequest {
                        source_video_id,
                        prompt: validated.prompt,
                        person_generation: Some(validated.person_generation.as_str().to_owned()),
                    },
                    region,
                )
                .await;
        }

        let task = GenerationTask::new_pending(validated.into_draft(user_id), &*self.clock);
        let submission = ProviderSubmission::Generation(GenerationSubmission::from_task(&task));
        self.admission.admit_and_submit(task, submission).await
    }

    /// Extends a completed video.
    ///
    /// # Errors
    ///
    /// See [`ExtensionService::extend`].
    pub async fn extend(
        &self,
        user_id: UserId,
        request: ExtensionRequest,
        region: Option<&UserRegion>,
    ) -> OrchestrationResult<GenerationTask> {
        self.extension.extend(user_id, request, region).await
    }

    /// Returns one of the caller's tasks.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::TaskNotFound`] when the task does not
    /// exist or belongs to someone else.
    pub async fn get(
        &self,
        user_id: UserId,
        task_id: GenerationTaskId,
    ) -> OrchestrationResult<GenerationTask> {
        self.ports
            .tasks
            .find_by_id(task_id)
            .await?
            .filter(|task| task.user_id() == user_id)
            .ok_or(OrchestrationError::TaskNotFound(task_id))
    }

    /// Lists the caller's tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Persistence`] when the store fails.
    pub async fn list(&self, user_id: UserId, query: TaskQuery) -> OrchestrationResult<TaskPage> {
        Ok(self.ports.tasks.list_for_user(user_id, query).await?)
    }

    /// Cancels a pending or processing task and returns its charge.
    ///
    /// A concurrent `pending -> processing` step is retried; any other
    /// concurrent change wins.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::CancellationRejected`] once download
    /// has begun or the task is terminal.
    pub async fn cancel(
        &self,
        user_id: UserId,
        task_id: GenerationTaskId,
    ) -> OrchestrationResult<GenerationTask> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut task = self.get(user_id, task_id).await?;
            let observed = task.status();
            if !observed.is_cancellable() {
                return Err(OrchestrationError::CancellationRejected {
                    id: task_id,
                    status: observed,
                });
            }

            task.mark_cancelled(&*self.clock)?;
            match self.ports.tasks.update_if_status(&task, observed).await {
                Ok(()) => {
                    info!(%task_id, %user_id, from = %observed, "task cancelled");
                    self.settlement.refund(&mut task).await;
                    return Ok(task);
                }
                Err(TaskRepositoryError::StatusConflict { actual, .. })
                    if actual.is_cancellable() && attempts < CANCEL_ATTEMPTS => {}
                Err(TaskRepositoryError::StatusConflict { actual, .. }) => {
                    return Err(OrchestrationError::CancellationRejected {
                        id: task_id,
                        status: actual,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
