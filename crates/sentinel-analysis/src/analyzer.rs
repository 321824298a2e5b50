use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use futures::future::join_all;
use reqwest::Url;
use sentinel_core::{normalize_domain, target_url, AppConfig, DomainError};
use sentinel_fetcher::HtmlFetcher;
use sentinel_signals::{blend, detect, technical_score, Signal};
use sentinel_upstream::{
    fallback_insight, insight_prompt, AuthorityClient, InsightClient, InsightSettings,
    UpstreamError,
};

use crate::error::{AnalyzeError, BatchError, SetupError};
use crate::ports::{AnalysisCache, InsightSource, MetricsSource, PageSource, UsageLedger};
use crate::types::{
    AnalysisResult, AnalysisStatus, Caller, GuestAdmission, QuotaReservation, ResultMetrics,
};

/// Limits and timing knobs for [`Analyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub single_fetch_timeout: Duration,
    pub batch_fetch_timeout: Duration,
    /// Entries analyzed concurrently per bulk window.
    pub window_size: usize,
    /// Pause between bulk windows; not applied after the last one.
    pub window_delay: Duration,
    pub max_batch_domains: usize,
    pub bulk_daily_cap: u32,
    pub guest_daily_limit: u32,
    pub cache_ttl: TimeDelta,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            single_fetch_timeout: Duration::from_secs(30),
            batch_fetch_timeout: Duration::from_secs(15),
            window_size: 5,
            window_delay: Duration::from_millis(200),
            max_batch_domains: 25,
            bulk_daily_cap: 500,
            guest_daily_limit: 3,
            cache_ttl: TimeDelta::hours(24),
        }
    }
}

impl AnalyzerSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            single_fetch_timeout: Duration::from_secs(config.single_fetch_timeout_secs),
            batch_fetch_timeout: Duration::from_secs(config.batch_fetch_timeout_secs),
            window_size: config.batch_window_size.max(1),
            window_delay: Duration::from_millis(config.batch_window_delay_ms),
            max_batch_domains: config.batch_max_domains,
            bulk_daily_cap: config.bulk_daily_domain_cap,
            guest_daily_limit: config.guest_daily_limit,
            cache_ttl: TimeDelta::try_hours(config.cache_ttl_hours)
                .unwrap_or_else(|| TimeDelta::hours(24)),
        }
    }
}

/// The services an [`Analyzer`] delegates to.
pub struct Collaborators {
    pub pages: Arc<dyn PageSource>,
    pub metrics: Arc<dyn MetricsSource>,
    pub insights: Arc<dyn InsightSource>,
    pub cache: Arc<dyn AnalysisCache>,
    pub ledger: Arc<dyn UsageLedger>,
}

impl Collaborators {
    /// Live HTTP clients configured from `config`, over the given store.
    /// Missing API keys are warned about once here; the clients then degrade
    /// to zero metrics and fallback insights.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if an HTTP client cannot be built or an
    /// upstream endpoint URL is invalid.
    pub fn live(
        config: &AppConfig,
        cache: Arc<dyn AnalysisCache>,
        ledger: Arc<dyn UsageLedger>,
    ) -> Result<Self, SetupError> {
        if config.authority_api_key.is_none() {
            tracing::warn!("DAPA_API_KEY not set; authority metrics will be zero");
        }
        if config.insight_api_key.is_none() {
            tracing::warn!("GROQ_API_KEY not set; insights will use the rule-based fallback");
        }

        let upstream_timeout = Duration::from_secs(config.upstream_timeout_secs);
        let pages = HtmlFetcher::new(&config.fetch_user_agent)?;
        let metrics = AuthorityClient::new(
            config.authority_api_key.clone(),
            &config.authority_api_url,
            upstream_timeout,
        )
        .map_err(SetupError::Authority)?;
        let insights = InsightClient::new(
            config.insight_api_key.clone(),
            &config.insight_api_url,
            InsightSettings::for_model(&config.insight_model),
            upstream_timeout,
        )
        .map_err(SetupError::Insight)?;

        Ok(Self {
            pages: Arc::new(pages),
            metrics: Arc::new(metrics),
            insights: Arc::new(insights),
            cache,
            ledger,
        })
    }
}

/// Runs single and bulk analyses.
///
/// Per domain the pipeline is: fetch markup, then authority lookup and signal
/// detection concurrently, then blend the scores and phrase an insight.
#[derive(Clone)]
pub struct Analyzer {
    pages: Arc<dyn PageSource>,
    metrics: Arc<dyn MetricsSource>,
    insights: Arc<dyn InsightSource>,
    cache: Arc<dyn AnalysisCache>,
    ledger: Arc<dyn UsageLedger>,
    settings: AnalyzerSettings,
}

impl Analyzer {
    #[must_use]
    pub fn new(collaborators: Collaborators, settings: AnalyzerSettings) -> Self {
        let Collaborators {
            pages,
            metrics,
            insights,
            cache,
            ledger,
        } = collaborators;
        Self {
            pages,
            metrics,
            insights,
            cache,
            ledger,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    /// Analyzes one URL for an interactive caller.
    ///
    /// Guests consume one daily check before the fetch starts, so an
    /// unreachable target still counts. The result cache is not consulted.
    ///
    /// # Errors
    ///
    /// - [`AnalyzeError::MissingUrl`] / [`AnalyzeError::InvalidUrl`] before any I/O.
    /// - [`AnalyzeError::GuestLimitReached`] when a guest is out of checks.
    /// - [`AnalyzeError::Unreachable`] when the page cannot be fetched.
    /// - [`AnalyzeError::Store`] when the guest ledger fails.
    pub async fn analyze_single(
        &self,
        url: &str,
        caller: &Caller,
    ) -> Result<AnalysisResult, AnalyzeError> {
        let target = target_url(url)?;
        let domain = normalize_domain(url)?;

        if let Caller::Guest(key) = caller {
            let limit = self.settings.guest_daily_limit;
            match self
                .ledger
                .admit_guest(key, limit, Utc::now().date_naive())
                .await?
            {
                GuestAdmission::Admitted { used } => {
                    tracing::debug!(domain = %domain, used, limit, "guest check admitted");
                }
                GuestAdmission::LimitReached => {
                    tracing::info!(domain = %domain, "guest daily limit reached");
                    return Err(AnalyzeError::GuestLimitReached { limit });
                }
            }
        }

        tracing::info!(domain = %domain, url = %target, "starting analysis");
        let html = self
            .pages
            .fetch_page(target.as_str(), self.settings.single_fetch_timeout)
            .await
            .map_err(|e| {
                tracing::warn!(domain = %domain, error = %e, "target unreachable");
                let status = e.status();
                AnalyzeError::Unreachable {
                    status,
                    message: status.map_or_else(|| e.to_string(), |s| s.to_string()),
                }
            })?;

        let result = self.score(&domain, html).await;
        tracing::info!(
            domain = %domain,
            spam_score = result.metrics.spam_score,
            "analysis complete"
        );
        Ok(result)
    }

    /// Analyzes a list of domains for an authenticated bulk caller.
    ///
    /// The whole list is charged against the caller's daily budget up front;
    /// a list that does not fit is refused without analyzing anything.
    /// Entries run in fixed-size concurrent windows and come back in input
    /// order. Fresh cached results are returned with `cached = true`.
    ///
    /// # Errors
    ///
    /// Returns a [`BatchError`] when the request is refused before processing.
    /// Per-entry problems never fail the batch; they become `failed` entries
    /// or degraded results.
    pub async fn analyze_batch(
        &self,
        caller_id: Option<&str>,
        urls: &[String],
    ) -> Result<Vec<AnalysisResult>, BatchError> {
        let caller_id = caller_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(BatchError::MissingCaller)?;
        if urls.is_empty() {
            return Err(BatchError::InvalidList);
        }
        let max = self.settings.max_batch_domains;
        if urls.len() > max {
            return Err(BatchError::TooManyDomains { max });
        }
        let count = u32::try_from(urls.len()).map_err(|_| BatchError::TooManyDomains { max })?;

        let cap = self.settings.bulk_daily_cap;
        match self
            .ledger
            .reserve_bulk_domains(caller_id, count, cap, Utc::now().date_naive())
            .await?
        {
            QuotaReservation::Reserved { used } => {
                tracing::info!(caller_id, domains = count, used, cap, "starting bulk analysis");
            }
            QuotaReservation::Exceeded { used } => {
                tracing::info!(caller_id, domains = count, used, cap, "bulk quota exceeded");
                return Err(BatchError::QuotaExceeded { used, cap });
            }
            QuotaReservation::UnknownCaller => return Err(BatchError::UnknownCaller),
        }

        let mut results = Vec::with_capacity(urls.len());
        let mut windows = urls.chunks(self.settings.window_size.max(1)).peekable();
        while let Some(window) = windows.next() {
            let outcomes = join_all(window.iter().map(|url| self.analyze_entry(url))).await;
            results.extend(outcomes);

            if windows.peek().is_some() && !self.settings.window_delay.is_zero() {
                tokio::time::sleep(self.settings.window_delay).await;
            }
        }

        tracing::info!(
            caller_id,
            domains = results.len(),
            cached = results.iter().filter(|r| r.cached == Some(true)).count(),
            "bulk analysis complete"
        );
        Ok(results)
    }

    /// One bulk entry: cache lookup, best-effort fetch, scoring, and a
    /// detached cache write.
    async fn analyze_entry(&self, input: &str) -> AnalysisResult {
        let (target, domain) = match resolve(input) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(input, error = %e, "skipping unparsable bulk entry");
                return AnalysisResult::failed(input.trim(), e.to_string());
            }
        };

        match self.cache.get(&domain).await {
            Ok(Some(entry)) if entry.is_fresh(Utc::now(), self.settings.cache_ttl) => {
                tracing::debug!(domain = %domain, stored_at = %entry.stored_at, "cache hit");
                let mut result = entry.result;
                result.cached = Some(true);
                return result;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "cache lookup failed; analyzing");
            }
        }

        let html = match self
            .pages
            .fetch_page(target.as_str(), self.settings.batch_fetch_timeout)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "fetch failed; scoring empty markup");
                String::new()
            }
        };

        let mut result = self.score(&domain, html).await;

        let cache = Arc::clone(&self.cache);
        let snapshot = result.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.put(&domain, &snapshot, Utc::now()).await {
                tracing::warn!(domain = %domain, error = %e, "cache write failed");
            }
        });

        result.cached = Some(false);
        result
    }

    /// Scores already-fetched markup. Never fails: metrics and insight
    /// problems degrade to zeros and fallback text.
    async fn score(&self, domain: &str, html: String) -> AnalysisResult {
        let (authority, signals) = tokio::join!(
            self.metrics.authority_metrics(domain),
            detect_off_runtime(domain, html)
        );

        let technical = technical_score(&signals);
        let blended = blend(technical, authority.spam_score);
        let failed: Vec<&str> = signals
            .iter()
            .filter(|s| s.detected)
            .map(|s| s.name.as_str())
            .collect();
        let insight = self
            .summarize(domain, authority.domain_authority, blended, &failed)
            .await;
        tracing::debug!(
            domain,
            technical,
            external = authority.spam_score,
            blended,
            failed = failed.len(),
            "scored page"
        );

        AnalysisResult {
            domain: domain.to_owned(),
            metrics: ResultMetrics {
                da: authority.domain_authority,
                pa: authority.page_authority,
                backlinks: authority.total_backlinks,
                spam_score: blended,
            },
            signals,
            insight,
            status: AnalysisStatus::Success,
            cached: None,
            error: None,
        }
    }

    async fn summarize(
        &self,
        domain: &str,
        domain_authority: i32,
        blended: u8,
        failed: &[&str],
    ) -> String {
        let prompt = insight_prompt(domain, domain_authority, blended, failed);
        match self.insights.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => return text.trim().to_owned(),
            Ok(_) => tracing::warn!(domain, "insight backend returned blank text"),
            Err(UpstreamError::MissingCredentials { .. }) => {
                tracing::debug!(domain, "insight API key not configured");
            }
            Err(e) => tracing::warn!(domain, error = %e, "insight backend failed"),
        }
        fallback_insight(domain, blended, failed)
    }
}

fn resolve(input: &str) -> Result<(Url, String), DomainError> {
    Ok((target_url(input)?, normalize_domain(input)?))
}

/// Runs the detector battery on the blocking pool. Deeply nested markup can
/// take seconds to parse.
async fn detect_off_runtime(domain: &str, html: String) -> Vec<Signal> {
    match tokio::task::spawn_blocking(move || detect(&html)).await {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(domain, error = %e, "signal detection failed; scoring empty markup");
            detect("")
        }
    }
}

#[cfg(test)]
#[path = "analyzer_test.rs"]
mod tests;
