use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const MIN_RADIUS_KM: f64 = 1.0;
const MAX_RADIUS_KM: f64 = 10.0;
const MAX_PAGE_SIZE: u32 = 100;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("HANDYHUB_ENV", "development"))?;

    let bind_addr = or_default("HANDYHUB_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("HANDYHUB_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("HANDYHUB_LOG_LEVEL", "info");
    let api_key_hash_salt = lookup("HANDYHUB_API_KEY_HASH_SALT").ok();

    let db_max_connections = parse_u32("HANDYHUB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("HANDYHUB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("HANDYHUB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let search_default_radius_km = or_default("HANDYHUB_SEARCH_DEFAULT_RADIUS_KM", "5")
        .parse::<f64>()
        .map_err(|e| invalid("HANDYHUB_SEARCH_DEFAULT_RADIUS_KM", e.to_string()))?;
    if !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&search_default_radius_km) {
        return Err(invalid(
            "HANDYHUB_SEARCH_DEFAULT_RADIUS_KM",
            format!("{search_default_radius_km} is outside {MIN_RADIUS_KM}..={MAX_RADIUS_KM}"),
        ));
    }

    let notifications_page_size = parse_u32("HANDYHUB_NOTIFICATIONS_PAGE_SIZE", "20")?;
    if notifications_page_size == 0 || notifications_page_size > MAX_PAGE_SIZE {
        return Err(invalid(
            "HANDYHUB_NOTIFICATIONS_PAGE_SIZE",
            format!("{notifications_page_size} is outside 1..={MAX_PAGE_SIZE}"),
        ));
    }

    let feed_channel_capacity = parse_usize("HANDYHUB_FEED_CHANNEL_CAPACITY", "64")?;
    if feed_channel_capacity == 0 {
        return Err(invalid(
            "HANDYHUB_FEED_CHANNEL_CAPACITY",
            "must be greater than zero".to_string(),
        ));
    }

    let device_location = lookup("HANDYHUB_DEVICE_LOCATION")
        .ok()
        .filter(|s| !s.trim().is_empty());

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        api_key_hash_salt,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        search_default_radius_km,
        notifications_page_size,
        feed_channel_capacity,
        device_location,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "HANDYHUB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
