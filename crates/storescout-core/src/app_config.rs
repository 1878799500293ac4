use std::net::SocketAddr;
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
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Storefront origin, e.g. `"https://store.playstation.com"`.
    pub storefront_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    /// `None` disables live rate refreshes; the default table is served instead.
    pub exchange_rate_url: Option<String>,
    pub rate_max_age_secs: u64,
    pub metadata_ttl_secs: u64,
    pub base_product_threshold: i32,
    pub match_candidates_per_region: usize,
    pub lexicon_path: Option<PathBuf>,
    pub rate_limit_per_minute: usize,
}
