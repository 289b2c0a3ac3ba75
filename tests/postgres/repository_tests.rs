//! Conditional updates and the refunded flag in the task table.

use crate::postgres::helpers::{pending_task, prepare};
use eyre::{OptionExt, ensure};
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use reelforge::generation::{
    domain::{GenerationStatus, GenerationTaskId, OperationId, TaskFailure},
    ports::{AdmissionGate, GenerationTaskRepository, TaskRepositoryError},
};
use reelforge::identity::domain::UserId;
use rstest::rstest;

#[rstest]
fn stale_writer_gets_a_status_conflict(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let (_cleanup, store) = prepare(shared_test_cluster, "repo_conflict")?;
    let user = UserId::new();
    store.fund(user, 100)?;
    let pending = pending_task(user)?;
    let mut submitted = pending.clone();
    submitted.mark_submitted(OperationId::new("operations/pg-1"), &DefaultClock)?;
    let mut cancelled = pending.clone();
    cancelled.mark_cancelled(&DefaultClock)?;
    let tasks = store.tasks();

    let (conflict, by_operation) = store.runtime.block_on(async {
        store.gate().admit(&pending, 3).await?;
        tasks
            .update_if_status(&submitted, GenerationStatus::Pending)
            .await?;
        let conflict = tasks
            .update_if_status(&cancelled, GenerationStatus::Pending)
            .await;
        let by_operation = tasks
            .find_by_operation_id(&OperationId::new("operations/pg-1"))
            .await?;
        Ok::<_, eyre::Report>((conflict, by_operation))
    })?;

    ensure!(
        matches!(
            conflict,
            Err(TaskRepositoryError::StatusConflict {
                id,
                expected: GenerationStatus::Pending,
                actual: GenerationStatus::Processing,
            }) if id == pending.id()
        ),
        "got {conflict:?}"
    );
    let stored = by_operation.ok_or_eyre("task should be found by operation id")?;
    ensure!(stored.status() == GenerationStatus::Processing);
    Ok(())
}

#[rstest]
fn refunded_flag_flips_once(shared_test_cluster: &'static TestCluster) -> eyre::Result<()> {
    let (_cleanup, store) = prepare(shared_test_cluster, "repo_refunded")?;
    let user = UserId::new();
    store.fund(user, 100)?;
    let mut task = pending_task(user)?;
    let admitted = task.clone();
    task.mark_failed(TaskFailure::new("TIMEOUT", "gave up"), &DefaultClock)?;
    let tasks = store.tasks();

    let (first, second, stored, missing) = store.runtime.block_on(async {
        store.gate().admit(&admitted, 3).await?;
        tasks.update_if_status(&task, GenerationStatus::Pending).await?;
        let first = tasks.mark_refunded(task.id()).await?;
        let second = tasks.mark_refunded(task.id()).await?;
        let stored = tasks.find_by_id(task.id()).await?;
        let missing = tasks.mark_refunded(GenerationTaskId::new()).await;
        Ok::<_, eyre::Report>((first, second, stored, missing))
    })?;

    ensure!(first);
    ensure!(!second);
    let reloaded = stored.ok_or_eyre("task should still exist")?;
    ensure!(reloaded.refunded());
    ensure!(reloaded.status() == GenerationStatus::Failed);
    ensure!(matches!(missing, Err(TaskRepositoryError::NotFound(_))));
    Ok(())
}
