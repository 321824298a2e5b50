//! Daily usage counters: bulk quotas in `callers`, guest checks in
//! `guest_usage`.
//!
//! Every check-and-increment is a single conditional statement, so
//! concurrent requests for the same caller cannot overspend the budget.

use chrono::NaiveDate;
use sentinel_analysis::{GuestAdmission, QuotaReservation};
use sqlx::PgPool;

use crate::{to_i32, DbError};

/// Insert a caller row if it does not exist yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn register_caller(pool: &PgPool, caller_id: &str) -> Result<(), DbError> {
    sqlx::query("INSERT INTO callers (caller_id) VALUES ($1) ON CONFLICT (caller_id) DO NOTHING")
        .bind(caller_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Reserve `count` bulk domains for `caller_id` against `cap` for `today`.
///
/// A stored date other than `today` counts as zero usage and is replaced.
/// When the update matches no row, a follow-up read tells an unknown caller
/// apart from an exhausted budget.
///
/// # Errors
///
/// Returns [`DbError::OutOfRange`] if `count` or `cap` exceed `i32::MAX`, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn reserve_bulk_domains(
    pool: &PgPool,
    caller_id: &str,
    count: u32,
    cap: u32,
    today: NaiveDate,
) -> Result<QuotaReservation, DbError> {
    let count = to_i32("count", count)?;
    let cap = to_i32("cap", cap)?;

    let reserved: Option<i32> = sqlx::query_scalar(
        "UPDATE callers SET \
             bulk_domains_today = CASE WHEN last_reset_date = $3 \
                 THEN bulk_domains_today + $2 ELSE $2 END, \
             last_reset_date = $3, \
             updated_at = NOW() \
         WHERE caller_id = $1 \
           AND (CASE WHEN last_reset_date = $3 THEN bulk_domains_today ELSE 0 END) + $2 <= $4 \
         RETURNING bulk_domains_today",
    )
    .bind(caller_id)
    .bind(count)
    .bind(today)
    .bind(cap)
    .fetch_optional(pool)
    .await?;

    if let Some(used) = reserved {
        return Ok(QuotaReservation::Reserved {
            used: u32::try_from(used).unwrap_or(0),
        });
    }

    let current: Option<i32> = sqlx::query_scalar(
        "SELECT CASE WHEN last_reset_date = $2 THEN bulk_domains_today ELSE 0 END \
         FROM callers WHERE caller_id = $1",
    )
    .bind(caller_id)
    .bind(today)
    .fetch_optional(pool)
    .await?;

    Ok(match current {
        Some(used) => QuotaReservation::Exceeded {
            used: u32::try_from(used).unwrap_or(0),
        },
        None => QuotaReservation::UnknownCaller,
    })
}

/// Count one single-analysis check for `guest_key` if it has checks left
/// for `today`.
///
/// # Errors
///
/// Returns [`DbError::OutOfRange`] if `limit` exceeds `i32::MAX`, or
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn admit_guest(
    pool: &PgPool,
    guest_key: &str,
    limit: u32,
    today: NaiveDate,
) -> Result<GuestAdmission, DbError> {
    if limit == 0 {
        return Ok(GuestAdmission::LimitReached);
    }
    let limit = to_i32("limit", limit)?;

    let admitted: Option<i32> = sqlx::query_scalar(
        "INSERT INTO guest_usage (guest_key, checks_today, usage_date) \
         VALUES ($1, 1, $2) \
         ON CONFLICT (guest_key) DO UPDATE SET \
             checks_today = CASE WHEN guest_usage.usage_date = EXCLUDED.usage_date \
                 THEN guest_usage.checks_today + 1 ELSE 1 END, \
             usage_date = EXCLUDED.usage_date \
         WHERE guest_usage.usage_date <> EXCLUDED.usage_date \
            OR guest_usage.checks_today < $3 \
         RETURNING checks_today",
    )
    .bind(guest_key)
    .bind(today)
    .bind(limit)
    .fetch_optional(pool)
    .await?;

    Ok(match admitted {
        Some(used) => GuestAdmission::Admitted {
            used: u32::try_from(used).unwrap_or(0),
        },
        None => GuestAdmission::LimitReached,
    })
}

/// Delete guest counters last used before `before`. Returns rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn purge_guest_usage(pool: &PgPool, before: NaiveDate) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM guest_usage WHERE usage_date < $1")
        .bind(before)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
