use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

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
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Parsing and validation, decoupled from the process environment so tests
/// can feed a plain map.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

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

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
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

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PRICEWATCH_ENV", "development"))?;
    let bind_addr = parse_addr("PRICEWATCH_BIND_ADDR", "0.0.0.0:3001")?;
    let log_level = or_default("PRICEWATCH_LOG_LEVEL", "info");
    let tracked_products_path = PathBuf::from(or_default(
        "PRICEWATCH_TRACKED_PRODUCTS_PATH",
        "./config/tracked_products.yaml",
    ));

    let db_max_connections = parse_u32("PRICEWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PRICEWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PRICEWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let chrome_path = lookup("PRICEWATCH_CHROME_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let scrape_timeout_secs = parse_u64("PRICEWATCH_SCRAPE_TIMEOUT_SECS", "60")?;
    let page_delay_min_ms = parse_u64("PRICEWATCH_PAGE_DELAY_MIN_MS", "1000")?;
    let page_delay_max_ms = parse_u64("PRICEWATCH_PAGE_DELAY_MAX_MS", "3000")?;
    let batch_delay_ms = parse_u64("PRICEWATCH_BATCH_DELAY_MS", "2000")?;
    let scraper_max_retries = parse_u32("PRICEWATCH_SCRAPER_MAX_RETRIES", "0")?;
    let scraper_retry_backoff_base_secs =
        parse_u64("PRICEWATCH_SCRAPER_RETRY_BACKOFF_BASE_SECS", "5")?;
    let tracking_schedule = or_default("PRICEWATCH_TRACKING_SCHEDULE", "0 0 */6 * * *");

    if page_delay_min_ms > page_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "PRICEWATCH_PAGE_DELAY_MIN_MS ({page_delay_min_ms}) must not exceed \
             PRICEWATCH_PAGE_DELAY_MAX_MS ({page_delay_max_ms})"
        )));
    }
    if scrape_timeout_secs == 0 {
        return Err(invalid(
            "PRICEWATCH_SCRAPE_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    if db_min_connections > db_max_connections {
        return Err(ConfigError::Validation(format!(
            "PRICEWATCH_DB_MIN_CONNECTIONS ({db_min_connections}) must not exceed \
             PRICEWATCH_DB_MAX_CONNECTIONS ({db_max_connections})"
        )));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        tracked_products_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        chrome_path,
        scrape_timeout_secs,
        page_delay_min_ms,
        page_delay_max_ms,
        batch_delay_ms,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        tracking_schedule,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
