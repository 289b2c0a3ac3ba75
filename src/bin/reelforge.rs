//! Reelforge HTTP server.
//!
//! Reads `REELFORGE_*` variables, wires the `PostgreSQL` adapters when
//! `REELFORGE_DATABASE_URL` is set (in-memory adapters otherwise), starts
//! the background finalizer and serves the API until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use reelforge::api::{AppState, router};
use reelforge::config::ReelforgeConfig;
use reelforge::credit::adapters::InMemoryCreditLedger;
use reelforge::credit::adapters::postgres::PostgresCreditLedger;
use reelforge::credit::domain::CreditAmount;
use reelforge::credit::ports::CreditLedger;
use reelforge::generation::adapters::{
    FilesystemAssetStore, InMemoryGenerationTaskRepository, LockingAdmissionGate,
    PostgresAdmissionGate, PostgresGenerationTaskRepository, VeoHttpProvider, VeoProviderConfig,
};
use reelforge::generation::ports::{AdmissionGate, GenerationTaskRepository};
use reelforge::generation::services::{GenerationFinalizer, GenerationPorts};
use reelforge::identity::adapters::StaticIdentityDirectory;
use reelforge::identity::ports::PlanDirectory;
use reelforge::telemetry;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ReelforgeConfig::from_env();
    telemetry::init(&config.log_filter, config.log_json)
        .map_err(|err| anyhow::anyhow!(err))
        .context("failed to install tracing subscriber")?;

    let directory = Arc::new(
        StaticIdentityDirectory::parse(&config.api_tokens).context("invalid REELFORGE_API_TOKENS")?,
    );
    if directory.token_count() == 0 {
        warn!("no API tokens configured; every request will be rejected");
    }

    let ports = build_ports(&config, &directory)?;
    let settings = config.orchestration();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let finalizer = GenerationFinalizer::new(
        ports.clone(),
        Arc::new(DefaultClock),
        settings.task_max_age,
    );
    let finalizer_task = tokio::spawn({
        let shutdown = shutdown_signal(shutdown_rx.clone());
        async move { finalizer.run(settings.poll_interval, shutdown).await }
    });

    let state = AppState::new(ports, directory, settings);
    let address = config
        .socket_addr()
        .with_context(|| format!("invalid REELFORGE_BIND '{}'", config.bind_address))?;
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, "reelforge listening");

    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
        }
        info!("shutdown requested");
        if shutdown_tx.send(true).is_err() {
            warn!("shutdown receivers already dropped");
        }
    });

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await
        .context("server error")?;
    finalizer_task.await.context("finalizer task panicked")?;
    info!("reelforge stopped");
    Ok(())
}

async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|requested| *requested).await.is_err() {
        warn!("shutdown channel closed");
    }
}

fn build_ports(
    config: &ReelforgeConfig,
    directory: &Arc<StaticIdentityDirectory>,
) -> Result<GenerationPorts> {
    let api_key = config
        .provider_api_key
        .clone()
        .context("REELFORGE_PROVIDER_API_KEY is required")?;
    let provider = VeoHttpProvider::new(VeoProviderConfig {
        base_url: config.provider_base_url.clone(),
        api_key,
        model: config.provider_model.clone(),
        request_timeout: config.submit_timeout,
    })
    .context("failed to build provider client")?;
    let assets = FilesystemAssetStore::open(&config.asset_dir)
        .with_context(|| format!("failed to open asset directory '{}'", config.asset_dir))?;
    let clock = Arc::new(DefaultClock);

    let (tasks, ledger, admission): (
        Arc<dyn GenerationTaskRepository>,
        Arc<dyn CreditLedger>,
        Arc<dyn AdmissionGate>,
    ) = if let Some(url) = &config.database_url {
        let pool = Pool::builder()
            .build(ConnectionManager::<PgConnection>::new(url))
            .context("failed to build PostgreSQL pool")?;
        info!("using PostgreSQL adapters");
        (
            Arc::new(PostgresGenerationTaskRepository::new(pool.clone())),
            Arc::new(PostgresCreditLedger::new(pool.clone())),
            Arc::new(PostgresAdmissionGate::new(pool, Arc::clone(&clock))),
        )
    } else {
        let tasks: Arc<dyn GenerationTaskRepository> =
            Arc::new(InMemoryGenerationTaskRepository::new());
        let opening = CreditAmount::new(config.initial_credits);
        let ledger: Arc<dyn CreditLedger> = Arc::new(
            directory
                .users()
                .fold(InMemoryCreditLedger::new(), |seeded, user| {
                    seeded.with_balance(user, opening)
                }),
        );
        warn!("REELFORGE_DATABASE_URL unset; state is kept in memory");
        let admission: Arc<dyn AdmissionGate> = Arc::new(LockingAdmissionGate::new(
            Arc::clone(&tasks),
            Arc::clone(&ledger),
            Arc::clone(&clock),
        ));
        (tasks, ledger, admission)
    };

    Ok(GenerationPorts {
        tasks,
        ledger,
        admission,
        provider: Arc::new(provider),
        assets: Arc::new(assets),
        plans: Arc::clone(directory) as Arc<dyn PlanDirectory>,
    })
}
