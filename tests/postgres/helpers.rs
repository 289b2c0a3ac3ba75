//! Shared wiring for `PostgreSQL` integration tests.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use eyre::eyre;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use reelforge::credit::adapters::postgres::PostgresCreditLedger;
use reelforge::generation::{
    adapters::{GenerationPgPool, PostgresAdmissionGate, PostgresGenerationTaskRepository},
    domain::GenerationTask,
    validation::{CreateGenerationRequest, validate_generation_request},
};
use reelforge::identity::domain::UserId;
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Schema applied to the template database.
const CREATE_TABLES_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_generation_tables/up.sql");

/// Template database name for the pre-migrated schema.
const TEMPLATE_DB: &str = "reelforge_test_template";

/// Connections per test database; enough for the race tests to overlap.
const POOL_SIZE: u32 = 6;

/// Ensures the template database exists with the schema applied.
fn ensure_template(cluster: &TestCluster) -> eyre::Result<()> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre!("{e}"))?;
            conn.batch_execute(CREATE_TABLES_SQL)
                .map_err(|e| eyre!("SQL error: {e}"))?;
            Ok(())
        })
        .map_err(|err| eyre!("template setup failed: {err}"))
}

/// Drops the per-test database once everything using it is gone.
pub struct CleanupGuard {
    cluster: &'static TestCluster,
    db_name: String,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Err(err) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {err}", self.db_name);
        }
    }
}

/// A migrated database with a runtime to drive the adapters.
pub struct TestStore {
    pub pool: GenerationPgPool,
    pub runtime: Runtime,
}

/// Creates a database from the template.
///
/// Bind the guard before the store so the pool closes before the drop.
pub fn prepare(
    cluster: &'static TestCluster,
    label: &str,
) -> eyre::Result<(CleanupGuard, TestStore)> {
    ensure_template(cluster)?;
    let db_name = format!("test_{label}_{}", Uuid::new_v4().simple());
    cluster
        .create_database_from_template(db_name.as_str(), TEMPLATE_DB)
        .map_err(|err| eyre!("database setup failed: {err}"))?;
    let guard = CleanupGuard {
        cluster,
        db_name: db_name.clone(),
    };

    let url = cluster.connection().database_url(&db_name);
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?;
    Ok((guard, TestStore { pool, runtime }))
}

impl TestStore {
    pub fn tasks(&self) -> PostgresGenerationTaskRepository {
        PostgresGenerationTaskRepository::new(self.pool.clone())
    }

    pub fn ledger(&self) -> PostgresCreditLedger {
        PostgresCreditLedger::new(self.pool.clone())
    }

    pub fn gate(&self) -> PostgresAdmissionGate<DefaultClock> {
        PostgresAdmissionGate::new(self.pool.clone(), Arc::new(DefaultClock))
    }

    /// Opens a credit account holding `balance`.
    pub fn fund(&self, user: UserId, balance: i64) -> eyre::Result<()> {
        let mut conn = self.pool.get()?;
        diesel::sql_query("INSERT INTO credit_accounts (user_id, balance) VALUES ($1, $2)")
            .bind::<diesel::sql_types::Uuid, _>(user.into_inner())
            .bind::<diesel::sql_types::BigInt, _>(balance)
            .execute(&mut conn)?;
        Ok(())
    }
}

/// A fresh 4-second 720p text task (40 credits) owned by `user`.
pub fn pending_task(user: UserId) -> eyre::Result<GenerationTask> {
    let request = CreateGenerationRequest {
        prompt: Some("a lighthouse at dusk".to_owned()),
        aspect_ratio: Some("16:9".to_owned()),
        resolution: Some("720p".to_owned()),
        duration: Some(4),
        generation_mode: Some("text-to-video".to_owned()),
        ..CreateGenerationRequest::default()
    };
    let draft = validate_generation_request(&request, None)?.into_draft(user);
    Ok(GenerationTask::new_pending(draft, &DefaultClock))
}
