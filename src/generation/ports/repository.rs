//! Repository port for generation task persistence and state-conditioned
//! updates.

use crate::generation::domain::{
    GenerationStatus, GenerationTask, GenerationTaskId, OperationId,
};
use crate::identity::domain::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Filter and paging for listing one user's tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskQuery {
    /// Only tasks in this status.
    pub status: Option<GenerationStatus>,
    /// Page size.
    pub limit: usize,
    /// Rows to skip.
    pub offset: usize,
}

impl TaskQuery {
    /// Default page size.
    pub const DEFAULT_LIMIT: usize = 20;
    /// Largest accepted page size.
    pub const MAX_LIMIT: usize = 100;

    /// Builds a query, clamping `limit` into `1..=MAX_LIMIT`.
    #[must_use]
    pub fn new(
        status: Option<GenerationStatus>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Self {
        Self {
            status,
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or_default(),
        }
    }
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// One page of a user's tasks, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPage {
    /// Tasks on this page.
    pub tasks: Vec<GenerationTask>,
    /// Tasks matching the filter across all pages.
    pub total: usize,
}

/// Generation task persistence contract.
///
/// Every mutation after creation goes through
/// [`GenerationTaskRepository::update_if_status`], which only writes when the
/// stored status still equals the caller's expectation.
#[async_trait]
pub trait GenerationTaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the id exists.
    async fn store(&self, task: &GenerationTask) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    async fn find_by_id(&self, id: GenerationTaskId)
    -> TaskRepositoryResult<Option<GenerationTask>>;

    /// Finds the task tracking a provider operation.
    async fn find_by_operation_id(
        &self,
        operation_id: &OperationId,
    ) -> TaskRepositoryResult<Option<GenerationTask>>;

    /// Counts the user's tasks in `pending`, `processing` or `downloading`.
    async fn count_active_for_user(&self, user_id: UserId) -> TaskRepositoryResult<usize>;

    /// Lists a user's tasks, newest first.
    async fn list_for_user(
        &self,
        user_id: UserId,
        query: TaskQuery,
    ) -> TaskRepositoryResult<TaskPage>;

    /// Lists every task in the given statuses, oldest first.
    async fn list_by_status(
        &self,
        statuses: &[GenerationStatus],
    ) -> TaskRepositoryResult<Vec<GenerationTask>>;

    /// Lists tasks created at or after `since` (all tasks when `None`).
    async fn list_created_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> TaskRepositoryResult<Vec<GenerationTask>>;

    /// Replaces the stored task when its status still equals `expected`.
    ///
    /// The `refunded` flag is never written here; use
    /// [`GenerationTaskRepository::mark_refunded`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for unknown tasks and
    /// [`TaskRepositoryError::StatusConflict`] when another writer moved the
    /// task first.
    async fn update_if_status(
        &self,
        task: &GenerationTask,
        expected: GenerationStatus,
    ) -> TaskRepositoryResult<()>;

    /// Sets the `refunded` flag if it was clear.
    ///
    /// Returns `true` for the caller that flipped the flag, `false` when it
    /// was already set.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for unknown tasks.
    async fn mark_refunded(&self, id: GenerationTaskId) -> TaskRepositoryResult<bool>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(GenerationTaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(GenerationTaskId),

    /// The stored status differed from the expected predecessor.
    #[error("task {id} is {actual}, expected {expected}")]
    StatusConflict {
        /// Task identifier.
        id: GenerationTaskId,
        /// Status the writer expected.
        expected: GenerationStatus,
        /// Status actually stored.
        actual: GenerationStatus,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
