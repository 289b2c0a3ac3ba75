//! In-memory credit ledger.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::credit::{
    domain::{
        ChargeOutcome, CreditAmount, CreditTransaction, LedgerPosting, RefundOutcome,
        TransactionKind,
    },
    ports::{CreditLedger, LedgerError, LedgerResult},
};
use crate::generation::domain::GenerationTaskId;
use crate::identity::domain::UserId;

/// Thread-safe in-memory ledger.
///
/// Balance checks and debits happen under a single write lock, so a charge
/// can never observe a balance another charge is about to spend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCreditLedger {
    state: Arc<RwLock<LedgerState>>,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<UserId, CreditAmount>,
    entries: Vec<CreditTransaction>,
}

impl LedgerState {
    fn has_entry(&self, task_id: GenerationTaskId, kind: TransactionKind) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.task_id() == task_id && entry.kind() == kind)
    }
}

fn poisoned(err: impl std::fmt::Display) -> LedgerError {
    LedgerError::persistence(std::io::Error::other(err.to_string()))
}

impl InMemoryCreditLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a ledger with an opening balance for `user_id`.
    #[must_use]
    pub fn with_balance(self, user_id: UserId, amount: CreditAmount) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.balances.insert(user_id, amount);
        }
        self
    }

    /// Overwrites the balance of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when the state lock is poisoned.
    pub fn set_balance(&self, user_id: UserId, amount: CreditAmount) -> LedgerResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.balances.insert(user_id, amount);
        Ok(())
    }
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn balance(&self, user_id: UserId) -> LedgerResult<CreditAmount> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.balances.get(&user_id).copied().unwrap_or_default())
    }

    async fn charge(&self, posting: &LedgerPosting) -> LedgerResult<ChargeOutcome> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.has_entry(posting.task_id, TransactionKind::Charge) {
            return Err(LedgerError::DuplicateCharge(posting.task_id));
        }

        let available = state
            .balances
            .get(&posting.user_id)
            .copied()
            .unwrap_or_default();
        let Some(remaining) = available.checked_sub(posting.amount) else {
            return Ok(ChargeOutcome::Insufficient { available });
        };

        state.balances.insert(posting.user_id, remaining);
        state
            .entries
            .push(CreditTransaction::record(TransactionKind::Charge, posting));
        Ok(ChargeOutcome::Charged { remaining })
    }

    async fn refund(&self, posting: &LedgerPosting) -> LedgerResult<RefundOutcome> {
        let mut state = self.state.write().map_err(poisoned)?;
        if !state.has_entry(posting.task_id, TransactionKind::Charge) {
            return Err(LedgerError::ChargeNotFound(posting.task_id));
        }
        if state.has_entry(posting.task_id, TransactionKind::Refund) {
            return Ok(RefundOutcome::AlreadyRefunded);
        }

        let balance = state.balances.entry(posting.user_id).or_default();
        *balance = balance.saturating_add(posting.amount);
        state
            .entries
            .push(CreditTransaction::record(TransactionKind::Refund, posting));
        Ok(RefundOutcome::Refunded)
    }

    async fn transactions_for_task(
        &self,
        task_id: GenerationTaskId,
    ) -> LedgerResult<Vec<CreditTransaction>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.task_id() == task_id)
            .cloned()
            .collect())
    }
}
