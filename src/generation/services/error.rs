//! Service-level error taxonomy shared by every orchestration entry point.

use crate::credit::{domain::CreditAmount, ports::LedgerError};
use crate::generation::{
    domain::{
        ExtensionIneligibility, GenerationDomainError, GenerationStatus, GenerationTaskId,
        OperationId, PERSISTENCE_ERROR, PROVIDER_ERROR,
    },
    ports::{AdmissionError, ProviderError, TaskRepositoryError},
    validation::ValidationError,
};
use crate::identity::ports::IdentityError;
use std::sync::Arc;
use thiserror::Error;

/// Result type for orchestration services.
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

/// Broad failure class, used to pick a status code and a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// User-correctable input.
    Validation,
    /// Rejected by the concurrency or credit gate.
    Admission,
    /// Extension source not eligible.
    Lineage,
    /// The external provider failed.
    Provider,
    /// Local storage failed.
    Persistence,
    /// The addressed resource does not exist for the caller.
    NotFound,
    /// The resource is in a state that forbids the operation.
    Conflict,
    /// Anything else.
    Unknown,
}

/// Errors returned by orchestration services.
#[derive(Debug, Clone, Error)]
pub enum OrchestrationError {
    /// Request validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The owner has no free concurrency slot.
    #[error("concurrent task limit reached ({active} of {limit} in use)")]
    ConcurrentLimitExceeded {
        /// Plan limit.
        limit: u32,
        /// Active tasks observed.
        active: usize,
    },

    /// The owner's balance does not cover the job.
    #[error("insufficient credits: {required} required, {available} available")]
    InsufficientCredits {
        /// Job cost.
        required: CreditAmount,
        /// Balance observed.
        available: CreditAmount,
    },

    /// The extension source is unknown or owned by someone else.
    #[error("source video not found")]
    SourceNotFound,

    /// The extension source is not eligible.
    #[error(transparent)]
    ExtensionRejected(#[from] ExtensionIneligibility),

    /// No task with this id belongs to the caller.
    #[error("task not found: {0}")]
    TaskNotFound(GenerationTaskId),

    /// No task tracks this provider operation.
    #[error("no task tracks operation {0}")]
    UnknownOperation(OperationId),

    /// Cancellation requested outside `pending`/`processing`.
    #[error("task {id} cannot be cancelled while {status}")]
    CancellationRejected {
        /// Task identifier.
        id: GenerationTaskId,
        /// Status observed.
        status: GenerationStatus,
    },

    /// A lifecycle transition was refused.
    #[error(transparent)]
    StateTransition(#[from] GenerationDomainError),

    /// The provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The credit charge did not finish in time.
    #[error("credit charge timed out")]
    ChargeTimeout,

    /// Local storage failed.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),

    /// The identity service failed.
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl OrchestrationError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.code.as_str(),
            Self::ConcurrentLimitExceeded { .. } => "CONCURRENT_LIMIT_EXCEEDED",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::SourceNotFound => "SOURCE_VIDEO_NOT_FOUND",
            Self::ExtensionRejected(_) => "EXTENSION_NOT_ALLOWED",
            Self::TaskNotFound(_) => "TASK_NOT_FOUND",
            Self::UnknownOperation(_) => "OPERATION_NOT_FOUND",
            Self::CancellationRejected { .. } => "CANCELLATION_REJECTED",
            Self::StateTransition(_) => "INVALID_STATE_TRANSITION",
            Self::Provider(_) => PROVIDER_ERROR,
            Self::ChargeTimeout | Self::Persistence(_) => PERSISTENCE_ERROR,
            Self::Identity(_) => "UNKNOWN_ERROR",
        }
    }

    /// Failure class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Validation,
            Self::ConcurrentLimitExceeded { .. } | Self::InsufficientCredits { .. } => {
                ErrorClass::Admission
            }
            Self::ExtensionRejected(_) => ErrorClass::Lineage,
            Self::SourceNotFound | Self::TaskNotFound(_) | Self::UnknownOperation(_) => {
                ErrorClass::NotFound
            }
            Self::CancellationRejected { .. } | Self::StateTransition(_) => ErrorClass::Conflict,
            Self::Provider(_) => ErrorClass::Provider,
            Self::ChargeTimeout | Self::Persistence(_) => ErrorClass::Persistence,
            Self::Identity(_) => ErrorClass::Unknown,
        }
    }

    /// Whether retrying the same request unmodified may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Provider | ErrorClass::Persistence)
    }

    /// Request field at fault, for validation errors.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(err) => Some(err.field),
            _ => None,
        }
    }
}

impl From<TaskRepositoryError> for OrchestrationError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::NotFound(id) => Self::TaskNotFound(id),
            other => Self::persistence(other),
        }
    }
}

impl From<LedgerError> for OrchestrationError {
    fn from(err: LedgerError) -> Self {
        Self::persistence(err)
    }
}

impl From<AdmissionError> for OrchestrationError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::ConcurrentLimitExceeded { limit, active } => {
                Self::ConcurrentLimitExceeded { limit, active }
            }
            AdmissionError::InsufficientCredits {
                required,
                available,
            } => Self::InsufficientCredits {
                required,
                available,
            },
            AdmissionError::Ledger(ledger) => ledger.into(),
            AdmissionError::Repository(repository) => repository.into(),
            other @ AdmissionError::Persistence(_) => Self::persistence(other),
        }
    }
}
