//! Postgres-backed implementation of the analysis store traits.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sentinel_analysis::{
    AnalysisCache, AnalysisResult, CachedAnalysis, GuestAdmission, QuotaReservation,
    StoreError, StoreMaintenance, UsageLedger,
};
use sqlx::PgPool;

use crate::{cache, usage, DbError};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Decodes a cached row. Rows whose JSON no longer matches the result shape
/// are reported as corrupt.
pub(crate) fn decode_row(row: cache::CachedAnalysisRow) -> Result<CachedAnalysis, StoreError> {
    let result: AnalysisResult =
        serde_json::from_value(row.result).map_err(|e| StoreError::Corrupt {
            key: row.domain.clone(),
            reason: e.to_string(),
        })?;
    Ok(CachedAnalysis {
        result,
        stored_at: row.updated_at,
    })
}

#[async_trait]
impl AnalysisCache for PgStore {
    async fn get(&self, domain: &str) -> Result<Option<CachedAnalysis>, StoreError> {
        cache::get_cached_analysis(&self.pool, domain)
            .await?
            .map(decode_row)
            .transpose()
    }

    async fn put(
        &self,
        domain: &str,
        result: &AnalysisResult,
        stored_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut snapshot = result.clone();
        snapshot.cached = None;
        let json = serde_json::to_value(&snapshot).map_err(|e| StoreError::Corrupt {
            key: domain.to_owned(),
            reason: e.to_string(),
        })?;
        cache::upsert_cached_analysis(&self.pool, domain, json, stored_at).await?;
        Ok(())
    }
}

#[async_trait]
impl UsageLedger for PgStore {
    async fn reserve_bulk_domains(
        &self,
        caller_id: &str,
        count: u32,
        cap: u32,
        today: NaiveDate,
    ) -> Result<QuotaReservation, StoreError> {
        Ok(usage::reserve_bulk_domains(&self.pool, caller_id, count, cap, today).await?)
    }

    async fn admit_guest(
        &self,
        guest_key: &str,
        limit: u32,
        today: NaiveDate,
    ) -> Result<GuestAdmission, StoreError> {
        Ok(usage::admit_guest(&self.pool, guest_key, limit, today).await?)
    }
}

#[async_trait]
impl StoreMaintenance for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }

    async fn purge_stale_cache(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(cache::purge_stale_cache(&self.pool, older_than).await?)
    }

    async fn purge_guest_usage(&self, before: NaiveDate) -> Result<u64, StoreError> {
        Ok(usage::purge_guest_usage(&self.pool, before).await?)
    }
}
