//! Concurrent admissions and settlement races.

use std::sync::Arc;

use super::helpers::{Pipeline, eight_second_request, operation_of};
use eyre::ensure;
use reelforge::credit::{domain::TransactionKind, ports::CreditLedger};
use reelforge::generation::{
    domain::GenerationStatus,
    ports::GenerationTaskRepository,
    services::OrchestrationError,
};
use reelforge::identity::domain::PlanTier;
use rstest::rstest;

#[rstest]
#[case(PlanTier::Basic, 1)]
#[case(PlanTier::Pro, 2)]
#[case(PlanTier::Max, 3)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_admissions_respect_plan_limit(
    #[case] plan: PlanTier,
    #[case] limit: usize,
) -> eyre::Result<()> {
    let pipeline = Pipeline::new(plan, 10_000);
    let handles = (0..10)
        .map(|_| {
            let service = Arc::clone(&pipeline.service);
            let user = pipeline.user;
            tokio::spawn(async move { service.create(user, &eight_second_request(), None).await })
        })
        .collect::<Vec<_>>();

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => admitted += 1,
            Err(OrchestrationError::ConcurrentLimitExceeded { .. }) => rejected += 1,
            Err(other) => eyre::bail!("unexpected admission error: {other}"),
        }
    }

    ensure!(admitted == limit, "admitted {admitted}, expected {limit}");
    ensure!(rejected == 10 - limit);
    ensure!(pipeline.tasks.count_active_for_user(pipeline.user).await? == limit);
    ensure!(pipeline.balance().await? == 10_000 - 80 * u64::try_from(limit)?);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_racing_failure_refunds_once() -> eyre::Result<()> {
    let pipeline = Pipeline::new(PlanTier::Basic, 100);
    let task = pipeline
        .service
        .create(pipeline.user, &eight_second_request(), None)
        .await?;
    pipeline
        .provider
        .fail_operation(&operation_of(&task)?, "SAFETY_FILTER", "blocked");

    let service = Arc::clone(&pipeline.service);
    let (user, task_id) = (pipeline.user, task.id());
    let cancel = tokio::spawn(async move { service.cancel(user, task_id).await });
    let tick = pipeline.finalizer.tick().await;
    let cancelled = cancel.await?;
    ensure!(tick.is_ok());

    let settled = pipeline
        .tasks
        .find_by_id(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task should exist"))?;
    ensure!(matches!(
        settled.status(),
        GenerationStatus::Cancelled | GenerationStatus::Failed
    ));
    ensure!(
        cancelled.is_ok() == (settled.status() == GenerationStatus::Cancelled),
        "cancel outcome must match the stored status"
    );
    let refunds = pipeline
        .ledger
        .transactions_for_task(task.id())
        .await?
        .iter()
        .filter(|entry| entry.kind() == TransactionKind::Refund)
        .count();
    ensure!(refunds == 1, "expected exactly one refund, found {refunds}");
    ensure!(pipeline.balance().await? == 100);
    Ok(())
}
