//! Refund idempotence on the credit tables.

use crate::postgres::helpers::{pending_task, prepare};
use eyre::ensure;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use reelforge::credit::{
    domain::{LedgerPosting, RefundOutcome, TransactionKind},
    ports::{CreditLedger, LedgerError},
};
use reelforge::generation::ports::AdmissionGate;
use reelforge::identity::domain::UserId;
use rstest::rstest;
use std::sync::Arc;

#[rstest]
fn second_refund_reports_already_refunded(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let (_cleanup, store) = prepare(shared_test_cluster, "ledger_refund")?;
    let user = UserId::new();
    store.fund(user, 100)?;
    let task = pending_task(user)?;
    let posting = LedgerPosting::new(user, task.id(), task.credit_cost(), &DefaultClock);
    let ledger = store.ledger();

    let (first, second, balance, entries) = store.runtime.block_on(async {
        store.gate().admit(&task, 3).await?;
        let first = ledger.refund(&posting).await?;
        let second = ledger.refund(&posting).await?;
        let balance = ledger.balance(user).await?;
        let entries = ledger.transactions_for_task(task.id()).await?;
        Ok::<_, eyre::Report>((first, second, balance.value(), entries))
    })?;

    ensure!(first == RefundOutcome::Refunded);
    ensure!(second == RefundOutcome::AlreadyRefunded);
    ensure!(balance == 100);
    let kinds = entries.iter().map(|entry| entry.kind()).collect::<Vec<_>>();
    ensure!(kinds == [TransactionKind::Charge, TransactionKind::Refund]);
    Ok(())
}

#[rstest]
fn racing_refunds_credit_the_balance_once(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let (_cleanup, store) = prepare(shared_test_cluster, "ledger_race")?;
    let user = UserId::new();
    store.fund(user, 100)?;
    let task = pending_task(user)?;
    let posting = LedgerPosting::new(user, task.id(), task.credit_cost(), &DefaultClock);
    let ledger = Arc::new(store.ledger());

    let (outcomes, balance) = store.runtime.block_on(async {
        store.gate().admit(&task, 3).await?;
        let handles = (0..4)
            .map(|_| {
                let shared = Arc::clone(&ledger);
                tokio::spawn(async move { shared.refund(&posting).await })
            })
            .collect::<Vec<_>>();
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await??);
        }
        let balance = ledger.balance(user).await?;
        Ok::<_, eyre::Report>((outcomes, balance.value()))
    })?;

    let refunded = outcomes
        .iter()
        .filter(|outcome| **outcome == RefundOutcome::Refunded)
        .count();
    ensure!(refunded == 1, "{refunded} refunds went through");
    ensure!(balance == 100, "balance was {balance}");
    Ok(())
}

#[rstest]
fn refund_without_charge_is_reported(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let (_cleanup, store) = prepare(shared_test_cluster, "ledger_uncharged")?;
    let user = UserId::new();
    store.fund(user, 100)?;
    let task = pending_task(user)?;
    let posting = LedgerPosting::new(user, task.id(), task.credit_cost(), &DefaultClock);

    let outcome = store.runtime.block_on(store.ledger().refund(&posting));

    ensure!(
        matches!(outcome, Err(LedgerError::ChargeNotFound(id)) if id == task.id()),
        "got {outcome:?}"
    );
    Ok(())
}
