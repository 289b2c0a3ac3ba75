//! Diesel row models for ledger persistence.

use super::schema::{credit_accounts, credit_transactions};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for ledger entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = credit_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreditTransactionRow {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Account identifier.
    pub user_id: uuid::Uuid,
    /// Task identifier.
    pub task_id: uuid::Uuid,
    /// Entry kind.
    pub kind: String,
    /// Credits moved.
    pub amount: i64,
    /// Entry timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for ledger entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credit_transactions)]
pub struct NewCreditTransactionRow {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Account identifier.
    pub user_id: uuid::Uuid,
    /// Task identifier.
    pub task_id: uuid::Uuid,
    /// Entry kind.
    pub kind: String,
    /// Credits moved.
    pub amount: i64,
    /// Entry timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model used when a refund lands on an account with no balance row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credit_accounts)]
pub struct NewCreditAccountRow {
    /// Account identifier.
    pub user_id: uuid::Uuid,
    /// Opening balance.
    pub balance: i64,
    /// Creation timestamp.
    pub updated_at: DateTime<Utc>,
}
