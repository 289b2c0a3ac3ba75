//! Domain model for video generation tasks.
//!
//! The mode of a task is a sum type whose variants carry exactly the inputs
//! that mode accepts, so a stored task can never hold a conflicting
//! combination of image fields.

mod cost;
mod error;
mod ids;
mod lineage;
mod mode;
mod params;
mod status;
mod task;

pub use cost::{CREDITS_PER_SECOND_720P, CREDITS_PER_SECOND_1080P, EXTENSION_COST, credit_cost};
pub use error::{GenerationDomainError, ParseGenerationStatusError, ParseParameterError};
pub use ids::{GenerationTaskId, OperationId, ParseGenerationTaskIdError};
pub use lineage::{
    ExtensionIneligibility, MAX_CHAIN_SECONDS, can_extend, check_extension_source,
};
pub use mode::{
    EXTENSION_SEGMENT_SECONDS, GenerationMode, GenerationModeKind, IMAGE_MODE_DURATION,
    MAX_REFERENCE_IMAGES, ReferenceImages, TEXT_TO_VIDEO_DURATIONS,
};
pub use params::{AspectRatio, PersonGeneration, Resolution};
pub use status::GenerationStatus;
pub use task::{
    GenerationDraft, GenerationTask, PERSISTENCE_ERROR, PROVIDER_ERROR,
    PersistedGenerationTaskData, SUBMISSION_ORPHANED, StoredAsset, TIMEOUT, TaskFailure,
};
