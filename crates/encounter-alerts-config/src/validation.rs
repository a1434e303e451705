// Configuration validation
//
// Validates that required fields are present and values are sensible

use super::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_engine_config(&config.engine)?;
    validate_database_config("bot_db", "BOT_DB_", &config.bot_db)?;
    validate_database_config("scanner_db", "SCANNER_DB_", &config.scanner_db)?;
    validate_gateway_config(&config.gateway)?;
    validate_server_config(&config.server)?;
    Ok(())
}

fn validate_engine_config(config: &EngineConfig) -> Result<()> {
    if config.tick_interval_secs == 0 {
        bail!("engine.tick_interval_secs must be greater than 0");
    }

    if config.lookback_secs == 0 {
        bail!("engine.lookback_secs must be greater than 0");
    }

    if config.io_timeout_secs == 0 {
        bail!("engine.io_timeout_secs must be greater than 0");
    }

    if config.lookback_secs > 3600 {
        warn!(
            lookback_secs = config.lookback_secs,
            "engine.lookback_secs is very large; every tick will rescan old encounters"
        );
    }

    if config.io_timeout_secs > config.tick_interval_secs {
        warn!(
            io_timeout_secs = config.io_timeout_secs,
            tick_interval_secs = config.tick_interval_secs,
            "engine.io_timeout_secs exceeds the tick interval; slow calls may delay ticks"
        );
    }

    Ok(())
}

fn validate_database_config(section: &str, env_key: &str, config: &DatabaseConfig) -> Result<()> {
    for (field, value) in [
        ("host", &config.host),
        ("user", &config.user),
        ("name", &config.name),
    ] {
        if value.is_empty() {
            bail!(
                "{section}.{field} is required\n\n\
                How to fix:\n\
                  • Environment: export {env_key}{upper}=...\n\
                  • TOML: [{section}]\n              {field} = \"...\"\n",
                upper = field.to_uppercase(),
            );
        }
    }

    if config.max_connections == 0 {
        bail!("{}.max_connections must be greater than 0", section);
    }

    Ok(())
}

fn validate_gateway_config(config: &GatewayConfig) -> Result<()> {
    if config.token.is_empty() {
        bail!(
            "Messaging gateway token is required\n\n\
            How to fix:\n\
              • Environment: export BOT_TOKEN=<token> or {}GATEWAY_TOKEN=<token>\n\
              • TOML: [gateway]\n              token = \"<token>\"\n",
            ENV_PREFIX
        );
    }

    if config.timeout_secs == 0 {
        bail!("gateway.timeout_secs must be greater than 0");
    }

    if !config.api_url.starts_with("http://") && !config.api_url.starts_with("https://") {
        bail!("gateway.api_url must be an http(s) URL");
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.listen_addr.is_empty() {
        bail!("server.listen_addr must not be empty");
    }

    // Basic validation that it looks like an address
    if !config.listen_addr.contains(':') {
        bail!("server.listen_addr must be in format 'host:port'");
    }

    Ok(())
}
