// Serve mode - scheduler loop plus a small health server
//
// Startup order:
// - Load name tables
// - Connect both databases and apply the bot schema
// - Build the subscriber and subscription indices
// - Spawn the scheduler, then serve /health and /ready until shutdown

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use encounter_alerts_config::RuntimeConfig;
use encounter_alerts_core::{
    DeliveryLedger, Engine, EngineParts, EngineSettings, Indices, MessageGateway,
};
use encounter_alerts_mysql::ScannerSource;
use encounter_alerts_telegram::TelegramGateway;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

mod handlers;
mod init;
pub mod scheduler;

use handlers::{health_check, ready_check};
pub use init::init_tracing;
use init::{init_bot_store, init_names, init_pool};
use scheduler::Scheduler;

/// State shared with the health handlers
#[derive(Clone)]
pub(crate) struct AppState {
    pub indices: Arc<Indices>,
    pub ledger: Arc<DeliveryLedger>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Entry point for serve mode (loads config automatically)
pub async fn run() -> Result<()> {
    let config = RuntimeConfig::load().context("Failed to load configuration")?;
    run_with_config(config).await
}

/// Entry point for serve mode with pre-loaded configuration (for CLI usage)
pub async fn run_with_config(config: RuntimeConfig) -> Result<()> {
    init_tracing(&config);

    let names = Arc::new(init_names(&config)?);

    let bot_store = Arc::new(init_bot_store(&config).await?);
    let scanner = Arc::new(ScannerSource::new(
        init_pool("scanner", &config.scanner_db, &config).await?,
    ));

    let indices = Arc::new(Indices::new().with_io_timeout(config.engine.io_timeout()));
    indices
        .rebuild_all(bot_store.as_ref())
        .await
        .context("Failed to build subscriber indices")?;
    let ledger = Arc::new(DeliveryLedger::new());

    let gateway: Arc<dyn MessageGateway> = Arc::new(
        TelegramGateway::new(
            &config.gateway.api_url,
            &config.gateway.token,
            config.gateway.timeout(),
        )
        .context("Failed to build messaging gateway client")?,
    );

    let engine = Arc::new(Engine::new(
        EngineParts {
            indices: Arc::clone(&indices),
            ledger: Arc::clone(&ledger),
            source: scanner,
            deliveries: bot_store,
            gateway,
            names,
        },
        EngineSettings {
            lookback: config.engine.lookback(),
            io_timeout: config.engine.io_timeout(),
            sticker_base_url: config.gateway.sticker_base_url.clone(),
        },
    ));

    let scheduler = Scheduler::spawn(engine, config.engine.tick_interval());

    let addr = config.server.listen_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to {}", addr))?;

    info!("Health endpoint listening on http://{}", addr);
    info!("Routes:");
    info!("  GET  http://{}/health - Health check", addr);
    info!("  GET  http://{}/ready  - Readiness check", addr);
    info!("Press Ctrl+C or send SIGTERM to stop");

    let served = axum::serve(listener, router(AppState { indices, ledger }))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    // Let an in-flight tick finish before exiting, even if the server failed.
    scheduler.stop().await;

    served?;
    info!("Shutdown complete");

    Ok(())
}
