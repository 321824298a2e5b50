use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; SEOSentinelBot/1.0; +https://seosentinel.com)";
pub const DEFAULT_AUTHORITY_API_URL: &str = "https://www.dapachecker.org/api/user/dapa-checker";
pub const DEFAULT_INSIGHT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_INSIGHT_MODEL: &str = "llama-3.3-70b-versatile";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
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
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let env = parse_environment(&or_default("SENTINEL_ENV", "development"))?;
    let bind_addr = parse_or(&lookup, "SENTINEL_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("SENTINEL_LOG_LEVEL", "info");
    let database_url = optional("DATABASE_URL");

    let db_max_connections = parse_or(&lookup, "SENTINEL_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_or(&lookup, "SENTINEL_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_or(&lookup, "SENTINEL_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_user_agent = or_default("SENTINEL_FETCH_USER_AGENT", DEFAULT_USER_AGENT);
    let single_fetch_timeout_secs =
        parse_or(&lookup, "SENTINEL_SINGLE_FETCH_TIMEOUT_SECS", "30")?;
    let batch_fetch_timeout_secs = parse_or(&lookup, "SENTINEL_BATCH_FETCH_TIMEOUT_SECS", "15")?;
    let upstream_timeout_secs = parse_or(&lookup, "SENTINEL_UPSTREAM_TIMEOUT_SECS", "20")?;

    let authority_api_key = optional("DAPA_API_KEY");
    let authority_api_url = or_default("SENTINEL_AUTHORITY_API_URL", DEFAULT_AUTHORITY_API_URL);
    let insight_api_key = optional("GROQ_API_KEY");
    let insight_api_url = or_default("SENTINEL_INSIGHT_API_URL", DEFAULT_INSIGHT_API_URL);
    let insight_model = or_default("SENTINEL_INSIGHT_MODEL", DEFAULT_INSIGHT_MODEL);

    let batch_window_size: usize = parse_or(&lookup, "SENTINEL_BATCH_WINDOW_SIZE", "5")?;
    if batch_window_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SENTINEL_BATCH_WINDOW_SIZE".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let batch_window_delay_ms = parse_or(&lookup, "SENTINEL_BATCH_WINDOW_DELAY_MS", "200")?;
    let batch_max_domains = parse_or(&lookup, "SENTINEL_BATCH_MAX_DOMAINS", "25")?;
    let bulk_daily_domain_cap = parse_or(&lookup, "SENTINEL_BULK_DAILY_DOMAIN_CAP", "500")?;
    let guest_daily_limit = parse_or(&lookup, "SENTINEL_GUEST_DAILY_LIMIT", "3")?;
    let cache_ttl_hours = parse_or(&lookup, "SENTINEL_CACHE_TTL_HOURS", "24")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        database_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_user_agent,
        single_fetch_timeout_secs,
        batch_fetch_timeout_secs,
        upstream_timeout_secs,
        authority_api_key,
        authority_api_url,
        insight_api_key,
        insight_api_url,
        insight_model,
        batch_window_size,
        batch_window_delay_ms,
        batch_max_domains,
        bulk_daily_domain_cap,
        guest_daily_limit,
        cache_ttl_hours,
    })
}

/// Parse `var` (or `default` when unset) into `T`.
fn parse_or<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SENTINEL_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
