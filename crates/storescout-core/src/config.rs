use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://open.er-api.com/v6/latest/EUR";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a pure
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

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

    let env = parse_environment(&or_default("STORESCOUT_ENV", "development"))?;

    let bind_addr = or_default("STORESCOUT_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("STORESCOUT_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("STORESCOUT_LOG_LEVEL", "info");

    let storefront_base_url = or_default(
        "STORESCOUT_STOREFRONT_BASE_URL",
        "https://store.playstation.com",
    )
    .trim_end_matches('/')
    .to_string();
    if !storefront_base_url.starts_with("http://") && !storefront_base_url.starts_with("https://")
    {
        return Err(invalid(
            "STORESCOUT_STOREFRONT_BASE_URL",
            format!("expected an http(s) URL, got \"{storefront_base_url}\""),
        ));
    }

    let request_timeout_secs = parse_u64("STORESCOUT_REQUEST_TIMEOUT_SECS", "10")?;
    let user_agent = or_default("STORESCOUT_USER_AGENT", "storescout/0.1 (price-discovery)");
    let max_retries = parse_u32("STORESCOUT_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("STORESCOUT_RETRY_BACKOFF_BASE_SECS", "1")?;

    // An explicitly empty value disables live refreshes.
    let exchange_rate_url = match lookup("STORESCOUT_EXCHANGE_RATE_URL") {
        Ok(raw) if raw.trim().is_empty() => None,
        Ok(raw) => Some(raw.trim().to_string()),
        Err(_) => Some(DEFAULT_EXCHANGE_RATE_URL.to_string()),
    };
    let rate_max_age_secs = parse_u64("STORESCOUT_RATE_MAX_AGE_SECS", "3600")?;
    let metadata_ttl_secs = parse_u64("STORESCOUT_METADATA_TTL_SECS", "86400")?;

    let base_product_threshold = or_default("STORESCOUT_BASE_PRODUCT_THRESHOLD", "20")
        .parse::<i32>()
        .map_err(|e| invalid("STORESCOUT_BASE_PRODUCT_THRESHOLD", e.to_string()))?;
    let match_candidates_per_region = parse_usize("STORESCOUT_MATCH_CANDIDATES", "5")?;
    if match_candidates_per_region == 0 {
        return Err(invalid(
            "STORESCOUT_MATCH_CANDIDATES",
            "must be at least 1".to_string(),
        ));
    }

    let lexicon_path = lookup("STORESCOUT_LEXICON_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let rate_limit_per_minute = parse_usize("STORESCOUT_RATE_LIMIT_PER_MINUTE", "120")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        storefront_base_url,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        exchange_rate_url,
        rate_max_age_secs,
        metadata_ttl_secs,
        base_product_threshold,
        match_candidates_per_region,
        lexicon_path,
        rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "STORESCOUT_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
