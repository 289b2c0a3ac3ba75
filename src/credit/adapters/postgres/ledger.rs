//! `PostgreSQL` ledger with row-locked conditional debits.

use super::{
    models::{CreditTransactionRow, NewCreditAccountRow, NewCreditTransactionRow},
    schema::{credit_accounts, credit_transactions},
};
use crate::credit::{
    domain::{
        ChargeOutcome, CreditAmount, CreditTransaction, LedgerPosting, RefundOutcome,
        TransactionKind,
    },
    ports::{CreditLedger, LedgerError, LedgerResult},
};
use crate::generation::domain::GenerationTaskId;
use crate::identity::domain::UserId;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by ledger adapters.
pub type CreditPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed credit ledger.
#[derive(Debug, Clone)]
pub struct PostgresCreditLedger {
    pool: CreditPgPool,
}

impl PostgresCreditLedger {
    /// Creates a new ledger from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: CreditPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut PgConnection) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(LedgerError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(LedgerError::persistence)?
    }
}

#[async_trait]
impl CreditLedger for PostgresCreditLedger {
    async fn balance(&self, user_id: UserId) -> LedgerResult<CreditAmount> {
        self.run_blocking(move |connection| {
            let balance = credit_accounts::table
                .find(user_id.into_inner())
                .select(credit_accounts::balance)
                .first::<i64>(connection)
                .optional()?;
            from_db_amount(balance.unwrap_or_default())
        })
        .await
    }

    async fn charge(&self, posting: &LedgerPosting) -> LedgerResult<ChargeOutcome> {
        let owned = *posting;
        self.run_blocking(move |connection| {
            connection.transaction::<_, LedgerError, _>(|tx| charge_in(tx, &owned))
        })
        .await
    }

    async fn refund(&self, posting: &LedgerPosting) -> LedgerResult<RefundOutcome> {
        let owned = *posting;
        self.run_blocking(move |connection| {
            connection.transaction::<_, LedgerError, _>(|tx| refund_in(tx, &owned))
        })
        .await
    }

    async fn transactions_for_task(
        &self,
        task_id: GenerationTaskId,
    ) -> LedgerResult<Vec<CreditTransaction>> {
        self.run_blocking(move |connection| {
            credit_transactions::table
                .filter(credit_transactions::task_id.eq(task_id.into_inner()))
                .order(credit_transactions::created_at.asc())
                .select(CreditTransactionRow::as_select())
                .load::<CreditTransactionRow>(connection)?
                .into_iter()
                .map(row_to_transaction)
                .collect()
        })
        .await
    }
}

/// Debits `posting` inside the caller's transaction.
///
/// The account row is locked with `FOR UPDATE` before the balance is read,
/// so concurrent debits for the same user serialise on it.
pub(crate) fn charge_in(
    connection: &mut PgConnection,
    posting: &LedgerPosting,
) -> LedgerResult<ChargeOutcome> {
    let available = lock_balance(connection, posting.user_id)?;
    let amount = to_db_amount(posting.amount)?;
    if available < amount {
        return Ok(ChargeOutcome::Insufficient {
            available: from_db_amount(available)?,
        });
    }

    let entry = new_entry_row(TransactionKind::Charge, posting)?;
    diesel::insert_into(credit_transactions::table)
        .values(&entry)
        .execute(connection)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                LedgerError::DuplicateCharge(posting.task_id)
            }
            other => LedgerError::persistence(other),
        })?;

    diesel::update(credit_accounts::table.find(posting.user_id.into_inner()))
        .set((
            credit_accounts::balance.eq(credit_accounts::balance - amount),
            credit_accounts::updated_at.eq(posting.recorded_at),
        ))
        .execute(connection)?;

    Ok(ChargeOutcome::Charged {
        remaining: from_db_amount(available - amount)?,
    })
}

/// Credits `posting` back inside the caller's transaction, at most once per
/// task.
fn refund_in(
    connection: &mut PgConnection,
    posting: &LedgerPosting,
) -> LedgerResult<RefundOutcome> {
    let task_uuid = posting.task_id.into_inner();
    let charges: i64 = credit_transactions::table
        .filter(credit_transactions::task_id.eq(task_uuid))
        .filter(credit_transactions::kind.eq(TransactionKind::Charge.as_str()))
        .count()
        .get_result(connection)?;
    if charges == 0 {
        return Err(LedgerError::ChargeNotFound(posting.task_id));
    }

    let amount = to_db_amount(posting.amount)?;
    let inserted = diesel::insert_into(credit_transactions::table)
        .values(&new_entry_row(TransactionKind::Refund, posting)?)
        .on_conflict((credit_transactions::task_id, credit_transactions::kind))
        .do_nothing()
        .execute(connection)?;
    if inserted == 0 {
        return Ok(RefundOutcome::AlreadyRefunded);
    }

    diesel::insert_into(credit_accounts::table)
        .values(&NewCreditAccountRow {
            user_id: posting.user_id.into_inner(),
            balance: amount,
            updated_at: posting.recorded_at,
        })
        .on_conflict(credit_accounts::user_id)
        .do_update()
        .set((
            credit_accounts::balance.eq(credit_accounts::balance + amount),
            credit_accounts::updated_at.eq(posting.recorded_at),
        ))
        .execute(connection)?;

    Ok(RefundOutcome::Refunded)
}

/// Locks the account row and returns its balance, zero when absent.
pub(crate) fn lock_balance(connection: &mut PgConnection, user_id: UserId) -> LedgerResult<i64> {
    let balance = credit_accounts::table
        .find(user_id.into_inner())
        .select(credit_accounts::balance)
        .for_update()
        .first::<i64>(connection)
        .optional()?;
    Ok(balance.unwrap_or_default())
}

fn new_entry_row(
    kind: TransactionKind,
    posting: &LedgerPosting,
) -> LedgerResult<NewCreditTransactionRow> {
    let entry = CreditTransaction::record(kind, posting);
    Ok(NewCreditTransactionRow {
        id: entry.id(),
        user_id: entry.user_id().into_inner(),
        task_id: entry.task_id().into_inner(),
        kind: kind.as_str().to_owned(),
        amount: to_db_amount(entry.amount())?,
        created_at: entry.created_at(),
    })
}

fn row_to_transaction(row: CreditTransactionRow) -> LedgerResult<CreditTransaction> {
    let kind = TransactionKind::try_from(row.kind.as_str()).map_err(LedgerError::persistence)?;
    let posting = LedgerPosting {
        user_id: UserId::from_uuid(row.user_id),
        task_id: GenerationTaskId::from_uuid(row.task_id),
        amount: from_db_amount(row.amount)?,
        recorded_at: row.created_at,
    };
    Ok(CreditTransaction::from_persisted(row.id, kind, posting))
}

fn to_db_amount(amount: CreditAmount) -> LedgerResult<i64> {
    i64::try_from(amount.value()).map_err(LedgerError::persistence)
}

fn from_db_amount(value: i64) -> LedgerResult<CreditAmount> {
    u64::try_from(value)
        .map(CreditAmount::new)
        .map_err(LedgerError::persistence)
}
