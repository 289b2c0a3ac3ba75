//! Extension of a completed video by one fixed-length segment.

use super::{AdmissionController, OrchestrationError, OrchestrationResult};
use crate::generation::{
    domain::{
        EXTENSION_COST, EXTENSION_SEGMENT_SECONDS, GenerationDraft, GenerationMode,
        GenerationModeKind, GenerationTask, GenerationTaskId, check_extension_source,
    },
    ports::{ExtensionSubmission, GenerationTaskRepository, ProviderSubmission},
    validation::{ValidationCode, ValidationError, validate_person_generation},
};
use crate::identity::domain::{UserId, UserRegion};
use minijinja::{Environment, context};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

const CONTINUATION_TEMPLATE: &str = "{{ original }}\n\nContinue the same scene: {{ continuation }}";

/// Caller input for an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRequest {
    /// Task whose video is extended.
    pub source_video_id: GenerationTaskId,
    /// What happens in the new segment.
    pub prompt: String,
    /// Requested person-generation policy.
    pub person_generation: Option<String>,
}

/// Validates lineage and admits extension jobs.
pub struct ExtensionService<C>
where
    C: Clock + Send + Sync,
{
    tasks: Arc<dyn GenerationTaskRepository>,
    admission: Arc<AdmissionController<C>>,
    clock: Arc<C>,
}

impl<C> ExtensionService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates the service.
    #[must_use]
    pub const fn new(
        tasks: Arc<dyn GenerationTaskRepository>,
        admission: Arc<AdmissionController<C>>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            tasks,
            admission,
            clock,
        }
    }

    /// Extends the caller's completed video by seven seconds.
    ///
    /// Every lineage rule is checked before any credit is touched.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::SourceNotFound`] for unknown or foreign
    /// sources, [`OrchestrationError::ExtensionRejected`] for ineligible
    /// ones, validation errors for the prompt and person-generation policy,
    /// and any admission or provider error.
    pub async fn extend(
        &self,
        user_id: UserId,
        request: ExtensionRequest,
        region: Option<&UserRegion>,
    ) -> OrchestrationResult<GenerationTask> {
        let continuation = request.prompt.trim();
        if continuation.is_empty() {
            return Err(ValidationError::new(
                ValidationCode::MissingPrompt,
                "prompt",
                "prompt is required",
            )
            .into());
        }

        let source = self
            .tasks
            .find_by_id(request.source_video_id)
            .await?
            .filter(|found| found.user_id() == user_id)
            .ok_or(OrchestrationError::SourceNotFound)?;
        check_extension_source(&source)?;
        let source_video_uri = source
            .provider_video_uri()
            .map(str::to_owned)
            .ok_or(OrchestrationError::SourceNotFound)?;

        let person_generation = validate_person_generation(
            GenerationModeKind::ExtendVideo,
            request.person_generation.as_deref(),
            region,
        )?;
        let composed = compose_extension_prompt(source.prompt(), continuation)?;

        let task = GenerationTask::new_pending(
            GenerationDraft {
                user_id,
                mode: GenerationMode::ExtendVideo {
                    source_video_id: source.id(),
                },
                prompt: continuation.to_owned(),
                negative_prompt: None,
                aspect_ratio: source.aspect_ratio(),
                resolution: source.resolution(),
                duration: EXTENSION_SEGMENT_SECONDS,
                chain_duration: source
                    .chain_duration()
                    .saturating_add(EXTENSION_SEGMENT_SECONDS),
                person_generation,
                credit_cost: EXTENSION_COST,
            },
            &*self.clock,
        );
        info!(
            task_id = %task.id(),
            source_task_id = %source.id(),
            chain_duration = task.chain_duration(),
            "extending video"
        );

        let submission = ProviderSubmission::Extension(ExtensionSubmission {
            source_video_uri,
            original_prompt: source.prompt().to_owned(),
            continuation_prompt: continuation.to_owned(),
            prompt: composed,
            aspect_ratio: source.aspect_ratio(),
            person_generation,
        });
        self.admission.admit_and_submit(task, submission).await
    }
}

/// Combines the source prompt with the continuation so the provider sees
/// the whole scene.
///
/// # Errors
///
/// Returns [`OrchestrationError::Persistence`] if the template fails to
/// render.
pub fn compose_extension_prompt(
    original: &str,
    continuation: &str,
) -> OrchestrationResult<String> {
    Environment::new()
        .render_str(
            CONTINUATION_TEMPLATE,
            context! { original => original.trim(), continuation => continuation.trim() },
        )
        .map_err(OrchestrationError::persistence)
}
