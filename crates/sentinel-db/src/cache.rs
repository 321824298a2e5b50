//! Database operations for the `cached_analyses` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `cached_analyses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CachedAnalysisRow {
    pub domain: String,
    pub result: Value,
    pub updated_at: DateTime<Utc>,
}

/// Store `result` as the current snapshot for `domain`, replacing any
/// earlier one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_cached_analysis(
    pool: &PgPool,
    domain: &str,
    result: Value,
    updated_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO cached_analyses (domain, result, updated_at) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (domain) DO UPDATE \
         SET result = EXCLUDED.result, updated_at = EXCLUDED.updated_at",
    )
    .bind(domain)
    .bind(result)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_cached_analysis(
    pool: &PgPool,
    domain: &str,
) -> Result<Option<CachedAnalysisRow>, DbError> {
    let row = sqlx::query_as::<_, CachedAnalysisRow>(
        "SELECT domain, result, updated_at FROM cached_analyses WHERE domain = $1",
    )
    .bind(domain)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Delete snapshots last written before `older_than`. Returns rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn purge_stale_cache(pool: &PgPool, older_than: DateTime<Utc>) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM cached_analyses WHERE updated_at < $1")
        .bind(older_than)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
