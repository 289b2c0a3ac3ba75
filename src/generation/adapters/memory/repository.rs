//! In-memory generation task repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::generation::{
    domain::{GenerationStatus, GenerationTask, GenerationTaskId, OperationId},
    ports::{
        GenerationTaskRepository, TaskPage, TaskQuery, TaskRepositoryError, TaskRepositoryResult,
    },
};
use crate::identity::domain::UserId;

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGenerationTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<GenerationTaskId, GenerationTask>,
    operation_index: HashMap<OperationId, GenerationTaskId>,
}

impl InMemoryGenerationTaskRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn index_operation(state: &mut InMemoryTaskState, task: &GenerationTask) {
    if let Some(operation_id) = task.operation_id() {
        state
            .operation_index
            .insert(operation_id.clone(), task.id());
    }
}

fn newest_first(tasks: &mut [GenerationTask]) {
    tasks.sort_by(|left, right| {
        right
            .created_at()
            .cmp(&left.created_at())
            .then_with(|| right.id().cmp(&left.id()))
    });
}

#[async_trait]
impl GenerationTaskRepository for InMemoryGenerationTaskRepository {
    async fn store(&self, task: &GenerationTask) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        index_operation(&mut state, task);
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: GenerationTaskId,
    ) -> TaskRepositoryResult<Option<GenerationTask>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_by_operation_id(
        &self,
        operation_id: &OperationId,
    ) -> TaskRepositoryResult<Option<GenerationTask>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .operation_index
            .get(operation_id)
            .and_then(|id| state.tasks.get(id))
            .cloned())
    }

    async fn count_active_for_user(&self, user_id: UserId) -> TaskRepositoryResult<usize> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.user_id() == user_id && task.status().is_active())
            .count())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        query: TaskQuery,
    ) -> TaskRepositoryResult<TaskPage> {
        let state = self.state.read().map_err(poisoned)?;
        let mut matching = state
            .tasks
            .values()
            .filter(|task| task.user_id() == user_id)
            .filter(|task| query.status.is_none_or(|status| task.status() == status))
            .cloned()
            .collect::<Vec<_>>();
        newest_first(&mut matching);
        let total = matching.len();
        let tasks = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        Ok(TaskPage { tasks, total })
    }

    async fn list_by_status(
        &self,
        statuses: &[GenerationStatus],
    ) -> TaskRepositoryResult<Vec<GenerationTask>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut matching = state
            .tasks
            .values()
            .filter(|task| statuses.contains(&task.status()))
            .cloned()
            .collect::<Vec<_>>();
        matching.sort_by_key(GenerationTask::created_at);
        Ok(matching)
    }

    async fn list_created_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> TaskRepositoryResult<Vec<GenerationTask>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut matching = state
            .tasks
            .values()
            .filter(|task| since.is_none_or(|start| task.created_at() >= start))
            .cloned()
            .collect::<Vec<_>>();
        matching.sort_by_key(GenerationTask::created_at);
        Ok(matching)
    }

    async fn update_if_status(
        &self,
        task: &GenerationTask,
        expected: GenerationStatus,
    ) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let stored = state
            .tasks
            .get(&task.id())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?;
        if stored.status() != expected {
            return Err(TaskRepositoryError::StatusConflict {
                id: task.id(),
                expected,
                actual: stored.status(),
            });
        }

        let updated = task.clone().with_refunded(stored.refunded());
        index_operation(&mut state, &updated);
        state.tasks.insert(updated.id(), updated);
        Ok(())
    }

    async fn mark_refunded(&self, id: GenerationTaskId) -> TaskRepositoryResult<bool> {
        let mut state = self.state.write().map_err(poisoned)?;
        let stored = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskRepositoryError::NotFound(id))?;
        if stored.refunded() {
            return Ok(false);
        }
        stored.mark_refunded();
        Ok(true)
    }
}
