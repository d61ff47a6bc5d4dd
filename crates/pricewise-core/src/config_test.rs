use std::collections::HashMap;
use std::env::VarError;
use std::path::Path;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "PRICEWISE_ENV"));
}

#[test]
fn build_app_config_uses_defaults_when_env_is_empty() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.data_dir, Path::new("./.pricewise"));
    assert!(cfg.stores_path.is_none());
    assert_eq!(cfg.fakestore_url, "https://fakestoreapi.com");
    assert_eq!(cfg.dummyjson_url, "https://dummyjson.com");
    assert_eq!(cfg.platzi_url, "https://api.escuelajs.co");
    assert_eq!(cfg.fetch_timeout_secs, 10);
    assert_eq!(cfg.user_agent, "pricewise/0.1 (price-comparison)");
    assert_eq!(cfg.fetch_max_retries, 1);
    assert_eq!(cfg.fetch_backoff_base_ms, 250);
    assert_eq!(cfg.autosave_interval_secs, 30);
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("PRICEWISE_ENV", "production");
    map.insert("PRICEWISE_DATA_DIR", "/var/lib/pricewise");
    map.insert("PRICEWISE_STORES_PATH", "./config/stores.yaml");
    map.insert("PRICEWISE_DUMMYJSON_URL", "http://127.0.0.1:9000");
    map.insert("PRICEWISE_FETCH_TIMEOUT_SECS", "3");
    map.insert("PRICEWISE_FETCH_MAX_RETRIES", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.data_dir, Path::new("/var/lib/pricewise"));
    assert_eq!(
        cfg.stores_path.as_deref(),
        Some(Path::new("./config/stores.yaml"))
    );
    assert_eq!(cfg.dummyjson_url, "http://127.0.0.1:9000");
    assert_eq!(cfg.fetch_timeout_secs, 3);
    assert_eq!(cfg.fetch_max_retries, 0);
}

#[test]
fn build_app_config_ignores_blank_stores_path() {
    let mut map = HashMap::new();
    map.insert("PRICEWISE_STORES_PATH", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.stores_path.is_none());
}

#[test]
fn build_app_config_fetch_timeout_invalid() {
    let mut map = HashMap::new();
    map.insert("PRICEWISE_FETCH_TIMEOUT_SECS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWISE_FETCH_TIMEOUT_SECS"),
        "expected InvalidEnvVar(PRICEWISE_FETCH_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_fetch_timeout_zero_rejected() {
    let mut map = HashMap::new();
    map.insert("PRICEWISE_FETCH_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, ref reason }) if var == "PRICEWISE_FETCH_TIMEOUT_SECS" && reason.contains("greater than zero")),
        "expected InvalidEnvVar(PRICEWISE_FETCH_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_autosave_interval_zero_rejected() {
    let mut map = HashMap::new();
    map.insert("PRICEWISE_AUTOSAVE_INTERVAL_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWISE_AUTOSAVE_INTERVAL_SECS"),
        "expected InvalidEnvVar(PRICEWISE_AUTOSAVE_INTERVAL_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_max_retries_invalid() {
    let mut map = HashMap::new();
    map.insert("PRICEWISE_FETCH_MAX_RETRIES", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWISE_FETCH_MAX_RETRIES"),
        "expected InvalidEnvVar(PRICEWISE_FETCH_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn build_app_config_backoff_base_override() {
    let mut map = HashMap::new();
    map.insert("PRICEWISE_FETCH_BACKOFF_BASE_MS", "1000");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.fetch_backoff_base_ms, 1000);
}
