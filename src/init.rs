// Initialization utilities for serve mode
//
// Logging/tracing setup and the adapters the engine is wired to

use anyhow::{Context, Result};
use encounter_alerts_config::{DatabaseConfig, LogFormat, RuntimeConfig};
use encounter_alerts_core::NameTable;
use encounter_alerts_mysql::{MySqlPool, MySqlStore};
use std::path::Path;
use tracing::info;

/// Initialize tracing/logging from RuntimeConfig
pub fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let server = &config.server;

    // Parse log level from config
    let env_filter =
        EnvFilter::try_new(&server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match server.log_format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
        }
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}

/// Load the static name and translation tables.
pub(crate) fn init_names(config: &RuntimeConfig) -> Result<NameTable> {
    let lookup = &config.lookup;
    NameTable::load(
        Path::new(&lookup.masterfile_path),
        Path::new(&lookup.translations_path),
    )
    .context("Failed to load name tables")
}

/// Connect to one database, bounding the connection wait by `io_timeout_secs`.
pub(crate) async fn init_pool(
    label: &str,
    db: &DatabaseConfig,
    config: &RuntimeConfig,
) -> Result<MySqlPool> {
    info!("Connecting to {} database at {}", label, db.redacted_url());
    let options =
        encounter_alerts_mysql::connect_options(&db.host, &db.user, &db.password, &db.name);
    encounter_alerts_mysql::connect(options, db.max_connections, config.engine.io_timeout())
        .await
        .with_context(|| format!("Failed to connect to {} database", label))
}

/// Open the bot database and make sure its tables exist.
pub(crate) async fn init_bot_store(config: &RuntimeConfig) -> Result<MySqlStore> {
    let pool = init_pool("bot", &config.bot_db, config).await?;
    let store = MySqlStore::new(pool);
    store
        .migrate()
        .await
        .context("Failed to apply bot database schema")?;
    Ok(store)
}
