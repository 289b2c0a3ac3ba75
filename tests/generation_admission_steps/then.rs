//! Then steps for generation admission BDD scenarios.

use super::world::{AdmissionWorld, run_async};
use reelforge::credit::ports::CreditLedger;
use reelforge::generation::domain::GenerationStatus;
use rstest_bdd_macros::then;

#[then(r#"the request is admitted with status "{status}""#)]
fn request_admitted(world: &AdmissionWorld, status: String) -> Result<(), eyre::Report> {
    let expected = GenerationStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = match world.last_result.as_ref() {
        Some(Ok(task)) => task,
        Some(Err(err)) => return Err(eyre::eyre!("expected admission, got {err}")),
        None => return Err(eyre::eyre!("missing request result")),
    };

    if task.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            task.status()
        ));
    }
    Ok(())
}

#[then(r#"the request is rejected with "{code}""#)]
fn request_rejected(world: &AdmissionWorld, code: String) -> Result<(), eyre::Report> {
    match world.last_result.as_ref() {
        Some(Err(err)) if err.code() == code => Ok(()),
        Some(Err(err)) => Err(eyre::eyre!("expected {code}, got {}", err.code())),
        Some(Ok(task)) => Err(eyre::eyre!("expected rejection, task {} was admitted", task.id())),
        None => Err(eyre::eyre!("missing request result")),
    }
}

#[then("the user's balance is {credits:u64}")]
fn balance_is(world: &AdmissionWorld, credits: u64) -> Result<(), eyre::Report> {
    let balance = run_async(world.ledger.balance(world.user))?.value();
    if balance != credits {
        return Err(eyre::eyre!("expected balance {credits}, found {balance}"));
    }
    Ok(())
}
