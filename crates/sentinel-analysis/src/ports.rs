//! Collaborator seams used by [`crate::Analyzer`], plus the adapters that
//! plug the real HTTP clients into them.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sentinel_fetcher::{FetchError, HtmlFetcher};
use sentinel_upstream::{AuthorityClient, AuthorityMetrics, InsightClient, UpstreamError};

use crate::error::StoreError;
use crate::types::{AnalysisResult, CachedAnalysis, GuestAdmission, QuotaReservation};

/// Source of raw page markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// Authority metrics for a hostname. Infallible: provider failures surface as
/// all-zero metrics.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn authority_metrics(&self, hostname: &str) -> AuthorityMetrics;
}

/// Text-generation backend that turns a prompt into a short summary.
#[async_trait]
pub trait InsightSource: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// Per-domain result cache. A newer `put` supersedes the stored snapshot.
#[async_trait]
pub trait AnalysisCache: Send + Sync {
    async fn get(&self, domain: &str) -> Result<Option<CachedAnalysis>, StoreError>;

    async fn put(
        &self,
        domain: &str,
        result: &AnalysisResult,
        stored_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Daily counters for bulk callers and guests.
///
/// Both operations are a single atomic check-and-increment; a date other than
/// the stored one implicitly resets the counter.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn reserve_bulk_domains(
        &self,
        caller_id: &str,
        count: u32,
        cap: u32,
        today: NaiveDate,
    ) -> Result<QuotaReservation, StoreError>;

    async fn admit_guest(
        &self,
        guest_key: &str,
        limit: u32,
        today: NaiveDate,
    ) -> Result<GuestAdmission, StoreError>;
}

/// Liveness and housekeeping hooks for whichever store backs the service.
#[async_trait]
pub trait StoreMaintenance: Send + Sync {
    /// Short backend name reported by health checks.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Deletes cache entries stored before `older_than`; returns the count.
    async fn purge_stale_cache(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Deletes guest counters last used before `before`; returns the count.
    async fn purge_guest_usage(&self, before: NaiveDate) -> Result<u64, StoreError>;
}

#[async_trait]
impl PageSource for HtmlFetcher {
    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.fetch(url, timeout).await
    }
}

#[async_trait]
impl MetricsSource for AuthorityClient {
    async fn authority_metrics(&self, hostname: &str) -> AuthorityMetrics {
        match self.fetch_metrics(hostname).await {
            Ok(metrics) => metrics,
            Err(UpstreamError::MissingCredentials { .. }) => {
                tracing::debug!(hostname, "authority API key not configured; using zero metrics");
                AuthorityMetrics::default()
            }
            Err(e) => {
                tracing::warn!(hostname, error = %e, "authority lookup failed; using zero metrics");
                AuthorityMetrics::default()
            }
        }
    }
}

#[async_trait]
impl InsightSource for InsightClient {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        InsightClient::complete(self, prompt).await
    }
}
