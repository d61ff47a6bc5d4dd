use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Directory holding one JSON file per persisted collection.
    pub data_dir: PathBuf,
    /// Optional YAML store roster; the built-in roster is used when `None`.
    pub stores_path: Option<PathBuf>,
    pub fakestore_url: String,
    pub dummyjson_url: String,
    pub platzi_url: String,
    /// Per-fetcher deadline covering the request and any retries.
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_ms: u64,
    pub autosave_interval_secs: u64,
}
