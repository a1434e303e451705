use super::{DatabaseConfig, LogFormat, RuntimeConfig};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "ENCOUNTER_ALERTS_";

/// Abstraction over environment-variable lookups so tests can supply
/// their own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the ENCOUNTER_ALERTS_ prefix.
    /// Used for the legacy deployment variables (BOT_TOKEN, BOT_DB_HOST, ...).
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides to the runtime config.
///
/// Legacy unprefixed variables are applied first so that the prefixed
/// form wins when both are present.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    apply_legacy_overrides(config, env);

    // Engine configuration
    if let Some(val) = get_env_u64(env, "TICK_INTERVAL_SECS")? {
        config.engine.tick_interval_secs = val;
    }
    if let Some(val) = get_env_u64(env, "LOOKBACK_SECS")? {
        config.engine.lookback_secs = val;
    }
    if let Some(val) = get_env_u64(env, "IO_TIMEOUT_SECS")? {
        config.engine.io_timeout_secs = val;
    }

    // Databases
    apply_database_overrides(&mut config.bot_db, env, "BOT_DB_")?;
    apply_database_overrides(&mut config.scanner_db, env, "SCANNER_DB_")?;

    // Gateway
    if let Some(token) = env.get("GATEWAY_TOKEN") {
        config.gateway.token = token;
    }
    if let Some(url) = env.get("GATEWAY_API_URL") {
        config.gateway.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(val) = get_env_u64(env, "GATEWAY_TIMEOUT_SECS")? {
        config.gateway.timeout_secs = val;
    }
    if let Some(url) = env.get("STICKER_BASE_URL") {
        config.gateway.sticker_base_url = url.trim_end_matches('/').to_string();
    }

    // Lookup tables
    if let Some(path) = env.get("MASTERFILE_PATH") {
        config.lookup.masterfile_path = path;
    }
    if let Some(path) = env.get("TRANSLATIONS_PATH") {
        config.lookup.translations_path = path;
    }

    // Server configuration (listen addr, log level/format)
    if let Some(addr) = env.get("LISTEN_ADDR") {
        config.server.listen_addr = addr;
    }
    if let Some(level) = env.get("LOG_LEVEL") {
        config.server.log_level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.server.log_format = format
            .parse::<LogFormat>()
            .context("Invalid ENCOUNTER_ALERTS_LOG_FORMAT value")?;
    }

    Ok(())
}

fn apply_legacy_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) {
    if let Some(token) = env.get_raw("BOT_TOKEN") {
        config.gateway.token = token;
    }

    for (db, prefix) in [
        (&mut config.bot_db, "BOT_DB_"),
        (&mut config.scanner_db, "SCANNER_DB_"),
    ] {
        if let Some(host) = env.get_raw(&format!("{}HOST", prefix)) {
            db.host = host;
        }
        if let Some(user) = env.get_raw(&format!("{}USER", prefix)) {
            db.user = user;
        }
        if let Some(pass) = env.get_raw(&format!("{}PASS", prefix)) {
            db.password = pass;
        }
        if let Some(name) = env.get_raw(&format!("{}NAME", prefix)) {
            db.name = name;
        }
    }
}

fn apply_database_overrides<E: EnvSource>(
    db: &mut DatabaseConfig,
    env: &E,
    prefix: &str,
) -> Result<()> {
    if let Some(host) = env.get(&format!("{}HOST", prefix)) {
        db.host = host;
    }
    if let Some(user) = env.get(&format!("{}USER", prefix)) {
        db.user = user;
    }
    if let Some(pass) = env.get(&format!("{}PASSWORD", prefix)) {
        db.password = pass;
    }
    if let Some(name) = env.get(&format!("{}NAME", prefix)) {
        db.name = name;
    }
    if let Some(val) = get_env_u32(env, &format!("{}MAX_CONNECTIONS", prefix))? {
        db.max_connections = val;
    }
    Ok(())
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_u32<E: EnvSource>(env: &E, key: &str) -> Result<Option<u32>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .parse::<u32>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
