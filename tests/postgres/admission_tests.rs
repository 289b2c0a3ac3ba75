//! Transactional admission against a real database.

use crate::postgres::helpers::{pending_task, prepare};
use eyre::ensure;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use reelforge::credit::ports::CreditLedger;
use reelforge::generation::ports::{AdmissionError, AdmissionGate, GenerationTaskRepository};
use reelforge::identity::domain::UserId;
use rstest::rstest;
use std::sync::Arc;

#[rstest]
fn concurrent_admissions_fill_exactly_the_free_slots(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let (_cleanup, store) = prepare(shared_test_cluster, "admission_race")?;
    let user = UserId::new();
    store.fund(user, 1_000)?;
    let gate = Arc::new(store.gate());
    let candidates = (0..6)
        .map(|_| pending_task(user))
        .collect::<eyre::Result<Vec<_>>>()?;

    let outcomes = store.runtime.block_on(async {
        let handles = candidates
            .into_iter()
            .map(|task| {
                let shared = Arc::clone(&gate);
                tokio::spawn(async move { shared.admit(&task, 2).await })
            })
            .collect::<Vec<_>>();
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await?);
        }
        Ok::<_, eyre::Report>(outcomes)
    })?;

    let admitted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    ensure!(admitted == 2, "admitted {admitted} of 6");
    let rejected_for_limit = outcomes
        .iter()
        .filter(|outcome| {
            matches!(
                outcome,
                Err(AdmissionError::ConcurrentLimitExceeded { limit: 2, .. })
            )
        })
        .count();
    ensure!(rejected_for_limit == 4, "{rejected_for_limit} hit the limit");
    let (active, balance) = store.runtime.block_on(async {
        let active = store.tasks().count_active_for_user(user).await?;
        let balance = store.ledger().balance(user).await?;
        Ok::<_, eyre::Report>((active, balance.value()))
    })?;
    ensure!(active == 2);
    ensure!(balance == 920, "balance was {balance}");
    Ok(())
}

#[rstest]
#[case::underfunded(Some(10), 10)]
#[case::no_account(None, 0)]
fn insufficient_credits_leave_no_task_row(
    shared_test_cluster: &'static TestCluster,
    #[case] funding: Option<i64>,
    #[case] expected_available: u64,
) -> eyre::Result<()> {
    let (_cleanup, store) = prepare(shared_test_cluster, "admission_poor")?;
    let user = UserId::new();
    if let Some(balance) = funding {
        store.fund(user, balance)?;
    }
    let task = pending_task(user)?;

    let (outcome, stored, entries, balance) = store.runtime.block_on(async {
        let outcome = store.gate().admit(&task, 3).await;
        let stored = store.tasks().find_by_id(task.id()).await?;
        let entries = store.ledger().transactions_for_task(task.id()).await?;
        let balance = store.ledger().balance(user).await?;
        Ok::<_, eyre::Report>((outcome, stored, entries, balance.value()))
    })?;

    ensure!(
        matches!(
            &outcome,
            Err(AdmissionError::InsufficientCredits { required, available })
                if required.value() == 40 && available.value() == expected_available
        ),
        "got {outcome:?}"
    );
    ensure!(stored.is_none());
    ensure!(entries.is_empty());
    ensure!(balance == expected_available);
    Ok(())
}
