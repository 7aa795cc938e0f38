// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daemon wiring and the one-shot subcommands.
//!
//! Startup order follows the dependency graph: storage, registry, provider,
//! analysis client, operator service, ingestion controller, gateway server,
//! ingestion loop, scheduler. Shutdown unwinds it: stop the timers, stop
//! the listener, drain the ingestion loop, checkpoint the database.

use std::sync::Arc;
use std::time::Duration;

use earshot_admin::AdminService;
use earshot_analysis::{AnalysisClient, Batcher, run_expiration_sweep};
use earshot_config::EarshotConfig;
use earshot_core::{ChatProvider, Clock, EarshotError, SystemClock};
use earshot_gateway::{AuthConfig, ConnectionRegistry, GatewayState, ServerConfig};
use earshot_ingest::{IngestController, MessageFilter};
use earshot_openai::OpenAiClient;
use earshot_scheduler::Scheduler;
use earshot_storage::Database;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Build the chat provider from config, or `None` without a credential.
fn build_provider(config: &EarshotConfig) -> Result<Option<Arc<dyn ChatProvider>>, EarshotError> {
    match &config.model.api_key {
        Some(api_key) => {
            let client = OpenAiClient::new(
                &config.model.api_base,
                api_key,
                &config.model.name,
                Duration::from_secs(config.model.timeout_secs),
            )?;
            Ok(Some(Arc::new(client)))
        }
        None => {
            warn!("model.api_key not set; analysis is disabled, ingestion continues");
            Ok(None)
        }
    }
}

fn build_analysis_client(
    config: &EarshotConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<AnalysisClient>, EarshotError> {
    let provider = build_provider(config)?;
    Ok(Arc::new(AnalysisClient::new(provider, clock, &config.model)))
}

/// Run the full daemon until SIGINT.
pub async fn run(config: EarshotConfig) -> Result<(), EarshotError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let db = Database::open(&config.storage.database_path).await?;

    let registry = Arc::new(ConnectionRegistry::new(clock.clone()));
    let client = build_analysis_client(&config, clock.clone())?;

    let admin = config.admin.operator_id.map(|operator_id| {
        Arc::new(AdminService::new(
            db.clone(),
            client.clone(),
            registry.clone(),
            operator_id,
            clock.clone(),
        ))
    });
    if admin.is_none() {
        info!("admin.operator_id not set; operator channel disabled");
    }

    if config.ingest.listen_group_ids.is_empty() {
        warn!("ingest.listen_group_ids is empty; every group message will be ignored");
    }
    if config.gateway.secret.is_none() {
        warn!("gateway.secret not set; any client may connect to the listener");
    }

    let controller = Arc::new(IngestController::new(
        db.clone(),
        MessageFilter::new(&config.ingest.listen_group_ids),
        admin,
        clock.clone(),
        config.analysis.long_message_threshold,
    ));

    let shutdown = CancellationToken::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(256);

    let gateway_state = GatewayState {
        registry: registry.clone(),
        inbound_tx,
        auth: AuthConfig {
            secret: config.gateway.secret.clone(),
        },
        start_time: std::time::Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let server_shutdown = shutdown.clone();
    let server_task = tokio::spawn(async move {
        earshot_gateway::start_server(&server_config, gateway_state, server_shutdown).await
    });

    let ingest_task = tokio::spawn(earshot_ingest::run_loop(controller.clone(), inbound_rx));

    let batcher = Arc::new(Batcher::new(
        db.clone(),
        client,
        config.analysis.clone(),
        clock.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(
        batcher,
        db.clone(),
        clock.clone(),
        config.analysis.interval_minutes,
        shutdown.clone(),
    )?);
    let job_handles = scheduler.start();

    info!(
        groups = ?config.ingest.listen_group_ids,
        port = config.gateway.port,
        interval_minutes = config.analysis.interval_minutes,
        "earshot up"
    );

    tokio::signal::ctrl_c().await.map_err(|e| EarshotError::Internal(
        format!("signal listener failed: {e}"),
    ))?;
    info!("shutdown signal received");
    shutdown.cancel();

    for handle in job_handles {
        let _ = handle.await;
    }
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "gateway server exited with error"),
        Err(e) => warn!(error = %e, "gateway server task panicked"),
    }
    // The gateway state (and its inbound sender) is gone now, so the
    // ingestion loop drains and stops on its own.
    let _ = ingest_task.await;

    db.close().await?;
    info!("shutdown complete");
    Ok(())
}

/// `earshot analyze`: one manual pass, aggregate result on stdout.
pub async fn run_single_analysis(config: EarshotConfig) -> Result<(), EarshotError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let db = Database::open(&config.storage.database_path).await?;
    let client = build_analysis_client(&config, clock.clone())?;

    let batcher = Batcher::new(db.clone(), client, config.analysis.clone(), clock);
    let outcome = batcher.run_pass().await?;
    println!(
        "pass {}: {} message(s) in {} unit(s), {} event(s) extracted, {} unit(s) failed",
        outcome.task_id,
        outcome.messages_processed,
        outcome.units_total,
        outcome.events_found,
        outcome.units_failed
    );

    db.close().await
}

/// `earshot sweep`: one expiration sweep, count on stdout.
pub async fn run_single_sweep(config: EarshotConfig) -> Result<(), EarshotError> {
    let clock = SystemClock;
    let db = Database::open(&config.storage.database_path).await?;

    let expired = run_expiration_sweep(&db, &clock).await?;
    println!("{expired} event(s) expired");

    db.close().await
}
