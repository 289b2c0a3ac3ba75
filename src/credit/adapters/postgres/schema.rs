//! Diesel schema for credit balances and ledger entries.

diesel::table! {
    /// One balance row per account.
    credit_accounts (user_id) {
        /// Account identifier.
        user_id -> Uuid,
        /// Current balance; constrained non-negative by the table.
        balance -> BigInt,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Charge and refund entries, unique per `(task_id, kind)`.
    credit_transactions (id) {
        /// Entry identifier.
        id -> Uuid,
        /// Account identifier.
        user_id -> Uuid,
        /// Generation task the entry belongs to.
        task_id -> Uuid,
        /// `charge` or `refund`.
        #[max_length = 16]
        kind -> Varchar,
        /// Credits moved.
        amount -> BigInt,
        /// Entry timestamp.
        created_at -> Timestamptz,
    }
}
