//! Startup wiring: store selection and collaborator construction.

use std::sync::Arc;

use anyhow::Context;
use sentinel_analysis::{
    AnalysisCache, Analyzer, AnalyzerSettings, Collaborators, MemoryStore, StoreMaintenance,
    UsageLedger,
};
use sentinel_core::{AppConfig, Environment};
use sentinel_db::PgStore;

/// One store seen through each of its roles.
#[derive(Clone)]
pub struct StoreHandles {
    pub cache: Arc<dyn AnalysisCache>,
    pub ledger: Arc<dyn UsageLedger>,
    pub maintenance: Arc<dyn StoreMaintenance>,
}

impl StoreHandles {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: AnalysisCache + UsageLedger + StoreMaintenance + 'static,
    {
        Self {
            cache: store.clone(),
            ledger: store.clone(),
            maintenance: store,
        }
    }
}

/// Postgres when `DATABASE_URL` is set (migrations applied), the in-memory
/// store in development, and a startup error otherwise.
///
/// # Errors
///
/// Returns an error if the pool cannot connect, migrations fail, or no
/// database is configured outside development.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<StoreHandles> {
    if config.database_url.is_some() {
        let pool = sentinel_db::connect_pool_from_config(config)
            .await
            .context("connecting to Postgres")?;
        let applied = sentinel_db::run_migrations(&pool)
            .await
            .context("running migrations")?;
        tracing::info!(applied, "store: using Postgres");
        return Ok(StoreHandles::from_store(Arc::new(PgStore::new(pool))));
    }

    if config.env == Environment::Development {
        tracing::warn!("DATABASE_URL not set; using the in-memory store for development");
        return Ok(StoreHandles::from_store(Arc::new(MemoryStore::new())));
    }

    anyhow::bail!("DATABASE_URL is required outside development")
}

/// Builds the analyzer over live HTTP collaborators and `store`.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built or an upstream
/// endpoint URL is invalid.
pub fn build_analyzer(config: &AppConfig, store: &StoreHandles) -> anyhow::Result<Analyzer> {
    let collaborators =
        Collaborators::live(config, Arc::clone(&store.cache), Arc::clone(&store.ledger))?;
    Ok(Analyzer::new(collaborators, AnalyzerSettings::from_app_config(config)))
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::*;

    fn config(env: Environment, database_url: Option<&str>) -> AppConfig {
        AppConfig {
            env,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            log_level: "info".to_string(),
            database_url: database_url.map(str::to_owned),
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
            fetch_user_agent: "SEOSentinelBot/1.0".to_string(),
            single_fetch_timeout_secs: 30,
            batch_fetch_timeout_secs: 15,
            upstream_timeout_secs: 20,
            authority_api_key: None,
            authority_api_url: "https://authority.example/api".to_string(),
            insight_api_key: None,
            insight_api_url: "https://insight.example/v1/chat/completions".to_string(),
            insight_model: "llama-3.3-70b-versatile".to_string(),
            batch_window_size: 5,
            batch_window_delay_ms: 200,
            batch_max_domains: 25,
            bulk_daily_domain_cap: 500,
            guest_daily_limit: 3,
            cache_ttl_hours: 24,
        }
    }

    #[tokio::test]
    async fn development_without_database_uses_memory_store() {
        let store = open_store(&config(Environment::Development, None))
            .await
            .expect("memory store");
        assert_eq!(store.maintenance.backend(), "memory");
    }

    #[tokio::test]
    async fn production_without_database_fails_startup() {
        let err = open_store(&config(Environment::Production, None))
            .await
            .err()
            .expect("startup error");
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn analyzer_builds_without_api_keys() {
        let config = config(Environment::Test, None);
        let store = StoreHandles::from_store(Arc::new(MemoryStore::new()));

        let analyzer = build_analyzer(&config, &store).expect("analyzer");
        assert_eq!(analyzer.settings().max_batch_domains, 25);
        assert_eq!(analyzer.settings().window_size, 5);
    }

    #[test]
    fn invalid_upstream_endpoint_is_reported() {
        let mut config = config(Environment::Test, None);
        config.insight_api_url = "not a url".to_string();
        let store = StoreHandles::from_store(Arc::new(MemoryStore::new()));

        let err = build_analyzer(&config, &store).err().expect("config error");
        assert!(format!("{err:#}").contains("insight"));
    }
}
