use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use encounter_alerts_config::RuntimeConfig;
use std::path::PathBuf;

/// Encounter subscription matching and notification dispatch
#[derive(Parser)]
#[command(name = "encounter-alerts")]
#[command(version)]
#[command(about = "Match scanner encounters against subscriptions and send notifications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Seconds between ticks (overrides config file)
    #[arg(short, long, value_name = "SECS", global = true)]
    interval: Option<u64>,

    /// Health server listen address (overrides config file)
    #[arg(short, long, value_name = "ADDR", global = true)]
    listen: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the polling loop and health server (default if no subcommand given)
    Serve,
    /// Load and validate configuration, then print it with secrets removed
    CheckConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::CheckConfig) => check_config(&cli),
        Some(Commands::Serve) | None => run_server(cli),
    }
}

fn run_server(cli: Cli) -> Result<()> {
    // Build tokio runtime and run async server
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    // run_with_config initializes tracing again; that is idempotent
    encounter_alerts::init_tracing(&config);
    display_startup_info(&config);

    encounter_alerts::run_with_config(config).await
}

fn check_config(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let rendered =
        serde_json::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered);
    println!("Configuration OK");
    Ok(())
}

/// Load configuration, apply CLI overrides (highest priority), validate.
fn resolve_config(cli: &Cli) -> Result<RuntimeConfig> {
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load().context("Failed to load configuration")?
    };

    apply_cli_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.server.log_level = level.clone();
    }

    if let Some(interval) = cli.interval {
        config.engine.tick_interval_secs = interval;
    }

    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen.clone();
    }
}

fn display_startup_info(config: &RuntimeConfig) {
    use tracing::info;

    info!("╭─────────────────────────────────────────────────");
    info!("│ encounter-alerts v{}", env!("CARGO_PKG_VERSION"));
    info!("├─────────────────────────────────────────────────");
    info!("│ Health address: http://{}", config.server.listen_addr);
    info!("│ Bot database: {}", config.bot_db.redacted_url());
    info!("│ Scanner database: {}", config.scanner_db.redacted_url());
    info!("│ Gateway: {}", config.gateway.api_url);
    info!("│ Log level: {}", config.server.log_level);
    info!("│ Tick interval: {}s", config.engine.tick_interval_secs);
    info!("│   - Lookback: {}s", config.engine.lookback_secs);
    info!("│   - Call timeout: {}s", config.engine.io_timeout_secs);
    info!("╰─────────────────────────────────────────────────");
}
