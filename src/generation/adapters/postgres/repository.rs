//! `PostgreSQL` repository for generation tasks.

use super::{
    models::{GenerationTaskRow, row_to_task, to_changeset, to_row},
    schema::generation_tasks,
};
use crate::generation::{
    domain::{GenerationStatus, GenerationTask, GenerationTaskId, OperationId},
    ports::{
        GenerationTaskRepository, TaskPage, TaskQuery, TaskRepositoryError, TaskRepositoryResult,
    },
};
use crate::identity::domain::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by generation adapters.
pub type GenerationPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed generation task repository.
#[derive(Debug, Clone)]
pub struct PostgresGenerationTaskRepository {
    pool: GenerationPgPool,
}

impl PostgresGenerationTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: GenerationPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl GenerationTaskRepository for PostgresGenerationTaskRepository {
    async fn store(&self, task: &GenerationTask) -> TaskRepositoryResult<()> {
        let row = to_row(task)?;
        self.run_blocking(move |connection| insert_task(connection, &row))
            .await
    }

    async fn find_by_id(
        &self,
        id: GenerationTaskId,
    ) -> TaskRepositoryResult<Option<GenerationTask>> {
        self.run_blocking(move |connection| {
            generation_tasks::table
                .find(id.into_inner())
                .select(GenerationTaskRow::as_select())
                .first::<GenerationTaskRow>(connection)
                .optional()?
                .map(row_to_task)
                .transpose()
        })
        .await
    }

    async fn find_by_operation_id(
        &self,
        operation_id: &OperationId,
    ) -> TaskRepositoryResult<Option<GenerationTask>> {
        let handle = operation_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            generation_tasks::table
                .filter(generation_tasks::operation_id.eq(handle))
                .select(GenerationTaskRow::as_select())
                .first::<GenerationTaskRow>(connection)
                .optional()?
                .map(row_to_task)
                .transpose()
        })
        .await
    }

    async fn count_active_for_user(&self, user_id: UserId) -> TaskRepositoryResult<usize> {
        self.run_blocking(move |connection| count_active(connection, user_id))
            .await
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        query: TaskQuery,
    ) -> TaskRepositoryResult<TaskPage> {
        self.run_blocking(move |connection| {
            let owner = user_id.into_inner();
            let status = query.status.map(|wanted| wanted.as_str().to_owned());

            let mut count_query = generation_tasks::table
                .filter(generation_tasks::user_id.eq(owner))
                .into_boxed();
            let mut page_query = generation_tasks::table
                .filter(generation_tasks::user_id.eq(owner))
                .into_boxed();
            if let Some(wanted) = status {
                count_query = count_query.filter(generation_tasks::status.eq(wanted.clone()));
                page_query = page_query.filter(generation_tasks::status.eq(wanted));
            }

            let total: i64 = count_query.count().get_result(connection)?;
            let rows = page_query
                .order((
                    generation_tasks::created_at.desc(),
                    generation_tasks::id.desc(),
                ))
                .limit(to_db_count(query.limit)?)
                .offset(to_db_count(query.offset)?)
                .select(GenerationTaskRow::as_select())
                .load::<GenerationTaskRow>(connection)?;

            Ok(TaskPage {
                tasks: rows
                    .into_iter()
                    .map(row_to_task)
                    .collect::<TaskRepositoryResult<Vec<_>>>()?,
                total: from_db_count(total)?,
            })
        })
        .await
    }

    async fn list_by_status(
        &self,
        statuses: &[GenerationStatus],
    ) -> TaskRepositoryResult<Vec<GenerationTask>> {
        let names = statuses
            .iter()
            .map(|status| status.as_str().to_owned())
            .collect::<Vec<_>>();
        self.run_blocking(move |connection| {
            generation_tasks::table
                .filter(generation_tasks::status.eq_any(names))
                .order((
                    generation_tasks::created_at.asc(),
                    generation_tasks::id.asc(),
                ))
                .select(GenerationTaskRow::as_select())
                .load::<GenerationTaskRow>(connection)?
                .into_iter()
                .map(row_to_task)
                .collect()
        })
        .await
    }

    async fn list_created_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> TaskRepositoryResult<Vec<GenerationTask>> {
        self.run_blocking(move |connection| {
            let mut query = generation_tasks::table.into_boxed();
            if let Some(cutoff) = since {
                query = query.filter(generation_tasks::created_at.ge(cutoff));
            }
            query
                .order((
                    generation_tasks::created_at.asc(),
                    generation_tasks::id.asc(),
                ))
                .select(GenerationTaskRow::as_select())
                .load::<GenerationTaskRow>(connection)?
                .into_iter()
                .map(row_to_task)
                .collect()
        })
        .await
    }

    async fn update_if_status(
        &self,
        task: &GenerationTask,
        expected: GenerationStatus,
    ) -> TaskRepositoryResult<()> {
        let id = task.id();
        let changes = to_changeset(task)?;
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                generation_tasks::table
                    .filter(generation_tasks::id.eq(id.into_inner()))
                    .filter(generation_tasks::status.eq(expected.as_str())),
            )
            .set(&changes)
            .execute(connection)?;
            if updated > 0 {
                return Ok(());
            }

            let stored = generation_tasks::table
                .find(id.into_inner())
                .select(generation_tasks::status)
                .first::<String>(connection)
                .optional()?;
            match stored {
                None => Err(TaskRepositoryError::NotFound(id)),
                Some(actual) => Err(TaskRepositoryError::StatusConflict {
                    id,
                    expected,
                    actual: GenerationStatus::try_from(actual.as_str())
                        .map_err(TaskRepositoryError::persistence)?,
                }),
            }
        })
        .await
    }

    async fn mark_refunded(&self, id: GenerationTaskId) -> TaskRepositoryResult<bool> {
        self.run_blocking(move |connection| {
            let flipped = diesel::update(
                generation_tasks::table
                    .filter(generation_tasks::id.eq(id.into_inner()))
                    .filter(generation_tasks::refunded.eq(false)),
            )
            .set(generation_tasks::refunded.eq(true))
            .execute(connection)?;
            if flipped > 0 {
                return Ok(true);
            }

            let exists: i64 = generation_tasks::table
                .filter(generation_tasks::id.eq(id.into_inner()))
                .count()
                .get_result(connection)?;
            if exists == 0 {
                Err(TaskRepositoryError::NotFound(id))
            } else {
                Ok(false)
            }
        })
        .await
    }
}

/// Inserts a task row, mapping primary-key collisions to
/// [`TaskRepositoryError::DuplicateTask`].
pub(super) fn insert_task(
    connection: &mut PgConnection,
    row: &GenerationTaskRow,
) -> TaskRepositoryResult<()> {
    diesel::insert_into(generation_tasks::table)
        .values(row)
        .execute(connection)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                TaskRepositoryError::DuplicateTask(GenerationTaskId::from_uuid(row.id))
            }
            other => TaskRepositoryError::persistence(other),
        })?;
    Ok(())
}

/// Counts the user's tasks in an active status.
pub(super) fn count_active(
    connection: &mut PgConnection,
    user_id: UserId,
) -> TaskRepositoryResult<usize> {
    let active = GenerationStatus::ACTIVE
        .iter()
        .map(|status| status.as_str())
        .collect::<Vec<_>>();
    let count: i64 = generation_tasks::table
        .filter(generation_tasks::user_id.eq(user_id.into_inner()))
        .filter(generation_tasks::status.eq_any(active))
        .count()
        .get_result(connection)?;
    from_db_count(count)
}

fn to_db_count(value: usize) -> TaskRepositoryResult<i64> {
    i64::try_from(value).map_err(TaskRepositoryError::persistence)
}

fn from_db_count(value: i64) -> TaskRepositoryResult<usize> {
    usize::try_from(value).map_err(TaskRepositoryError::persistence)
}
