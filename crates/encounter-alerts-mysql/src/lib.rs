//! MySQL adapters for encounter-alerts.
//!
//! - [`MySqlStore`]: bot database holding preferences and delivery records.
//! - [`ScannerSource`]: read-only scanner database the encounters come from.

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
pub use sqlx::MySqlPool;
use tracing::info;

mod bot;
mod rows;
mod scanner;

pub use bot::MySqlStore;
pub use scanner::ScannerSource;

const DEFAULT_PORT: u16 = 3306;

/// Connection options from discrete settings. `address` is `host` or
/// `host:port`; credentials are passed through verbatim.
pub fn connect_options(
    address: &str,
    user: &str,
    password: &str,
    database: &str,
) -> MySqlConnectOptions {
    let (host, port) = split_address(address);
    let mut options = MySqlConnectOptions::new()
        .host(host)
        .port(port.unwrap_or(DEFAULT_PORT))
        .username(user)
        .database(database);
    if !password.is_empty() {
        options = options.password(password);
    }
    options
}

fn split_address(address: &str) -> (&str, Option<u16>) {
    let Some((host, port)) = address.rsplit_once(':') else {
        return (address, None);
    };
    let bracketed = host.starts_with('[') && host.ends_with(']');
    // A bare IPv6 literal has no port.
    if host.contains(':') && !bracketed {
        return (address, None);
    }
    match port.parse() {
        Ok(port) => (host.trim_start_matches('[').trim_end_matches(']'), Some(port)),
        Err(_) => (address, None),
    }
}

/// Open a connection pool and verify it with one round trip.
pub async fn connect(
    options: MySqlConnectOptions,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    info!(max_connections, "Connected to MySQL");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_with_url_metacharacters_are_kept_apart_from_host() {
        let options = connect_options("db:3307", "bot@ops", "p@ss#1/?:", "alerts");
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 3307);
        assert_eq!(options.get_username(), "bot@ops");
        assert_eq!(options.get_database(), Some("alerts"));
    }

    #[test]
    fn port_defaults_when_address_has_none() {
        let options = connect_options("scanner.internal", "root", "", "rdmdb");
        assert_eq!(options.get_host(), "scanner.internal");
        assert_eq!(options.get_port(), 3306);
    }

    #[test]
    fn ipv6_addresses() {
        assert_eq!(split_address("[::1]:3310"), ("::1", Some(3310)));
        assert_eq!(split_address("::1"), ("::1", None));
        assert_eq!(split_address("db:notaport"), ("db:notaport", None));
    }
}
