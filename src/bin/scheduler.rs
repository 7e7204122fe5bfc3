//! Scheduler service binary: admission poller plus dispatch loops.

use std::sync::Arc;

use anyhow::Context;
use post_scheduler::builders::{build_queue, build_router};
use post_scheduler::config::SchedulerConfig;
use post_scheduler::core::AppResult;
use post_scheduler::infra::source::PostgresSourceStore;
use post_scheduler::runtime::{SchedulerService, TokioSpawner};
use post_scheduler::util::init_tracing_for;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> AppResult<()> {
    let config = SchedulerConfig::from_env().context("failed to load config")?;
    init_tracing_for(&config.environment);
    info!(environment = %config.environment, "starting scheduler service");

    let queue = build_queue(&config.queue)
        .await
        .context("failed to open delivery queue")?;
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required")?;
    let source = Arc::new(PostgresSourceStore::connect(database_url).await?);
    let router = Arc::new(build_router(&config.credentials));

    let service = SchedulerService::new(&config, queue, source, router, TokioSpawner::current());
    let cancel = CancellationToken::new();
    let handle = service.start(&cancel);
    info!(dispatchers = config.dispatch.dispatchers, "scheduler service running");

    shutdown_signal().await;
    info!("shutting down scheduler service");
    cancel.cancel();
    handle.wait_for_shutdown().await;
    info!(stats = ?service.stats().snapshot(), "scheduler service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
