use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_user_agent: String,
    pub single_fetch_timeout_secs: u64,
    pub batch_fetch_timeout_secs: u64,
    pub upstream_timeout_secs: u64,
    pub authority_api_key: Option<String>,
    pub authority_api_url: String,
    pub insight_api_key: Option<String>,
    pub insight_api_url: String,
    pub insight_model: String,
    pub batch_window_size: usize,
    pub batch_window_delay_ms: u64,
    pub batch_max_domains: usize,
    pub bulk_daily_domain_cap: u32,
    pub guest_daily_limit: u32,
    pub cache_ttl_hours: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("single_fetch_timeout_secs", &self.single_fetch_timeout_secs)
            .field("batch_fetch_timeout_secs", &self.batch_fetch_timeout_secs)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field(
                "authority_api_key",
                &self.authority_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("authority_api_url", &self.authority_api_url)
            .field(
                "insight_api_key",
                &self.insight_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("insight_api_url", &self.insight_api_url)
            .field("insight_model", &self.insight_model)
            .field("batch_window_size", &self.batch_window_size)
            .field("batch_window_delay_ms", &self.batch_window_delay_ms)
            .field("batch_max_domains", &self.batch_max_domains)
            .field("bulk_daily_domain_cap", &self.bulk_daily_domain_cap)
            .field("guest_daily_limit", &self.guest_daily_limit)
            .field("cache_ttl_hours", &self.cache_ttl_hours)
            .finish()
    }
}
