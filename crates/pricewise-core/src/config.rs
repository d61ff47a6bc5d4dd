use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

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
/// Every variable is optional; the lookup is injected so tests can drive it
/// from a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = parse_u64(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("PRICEWISE_ENV", "development"))?;
    let log_level = or_default("PRICEWISE_LOG_LEVEL", "info");
    let data_dir = PathBuf::from(or_default("PRICEWISE_DATA_DIR", "./.pricewise"));
    let stores_path = lookup("PRICEWISE_STORES_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let fakestore_url = or_default("PRICEWISE_FAKESTORE_URL", "https://fakestoreapi.com");
    let dummyjson_url = or_default("PRICEWISE_DUMMYJSON_URL", "https://dummyjson.com");
    let platzi_url = or_default("PRICEWISE_PLATZI_URL", "https://api.escuelajs.co");

    let fetch_timeout_secs = parse_positive_u64("PRICEWISE_FETCH_TIMEOUT_SECS", "10")?;
    let user_agent = or_default("PRICEWISE_USER_AGENT", "pricewise/0.1 (price-comparison)");
    let fetch_max_retries = parse_u32("PRICEWISE_FETCH_MAX_RETRIES", "1")?;
    let fetch_backoff_base_ms = parse_u64("PRICEWISE_FETCH_BACKOFF_BASE_MS", "250")?;
    let autosave_interval_secs = parse_positive_u64("PRICEWISE_AUTOSAVE_INTERVAL_SECS", "30")?;

    Ok(AppConfig {
        env,
        log_level,
        data_dir,
        stores_path,
        fakestore_url,
        dummyjson_url,
        platzi_url,
        fetch_timeout_secs,
        user_agent,
        fetch_max_retries,
        fetch_backoff_base_ms,
        autosave_interval_secs,
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
            var: "PRICEWISE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
