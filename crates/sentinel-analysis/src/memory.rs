//! Process-local store used by the CLI, development servers and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::ports::{AnalysisCache, StoreMaintenance, UsageLedger};
use crate::types::{AnalysisResult, CachedAnalysis, GuestAdmission, QuotaReservation};

#[derive(Debug, Default)]
struct CallerUsage {
    domains_today: u32,
    last_reset: Option<NaiveDate>,
}

#[derive(Debug)]
struct GuestUsage {
    checks_today: u32,
    usage_date: NaiveDate,
}

#[derive(Debug, Default)]
struct State {
    cache: HashMap<String, CachedAnalysis>,
    callers: HashMap<String, CallerUsage>,
    guests: HashMap<String, GuestUsage>,
}

/// In-memory implementation of every store trait, guarded by one mutex so
/// each check-and-increment is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `caller_id` known to the bulk ledger. Re-registering keeps the
    /// existing counters.
    pub async fn register_caller(&self, caller_id: &str) {
        self.state
            .lock()
            .await
            .callers
            .entry(caller_id.to_owned())
            .or_default();
    }

    /// Bulk domains counted for `caller_id` on `today`, if the caller exists.
    pub async fn bulk_usage(&self, caller_id: &str, today: NaiveDate) -> Option<u32> {
        let state = self.state.lock().await;
        state.callers.get(caller_id).map(|usage| {
            if usage.last_reset == Some(today) {
                usage.domains_today
            } else {
                0
            }
        })
    }
}

#[async_trait]
impl AnalysisCache for MemoryStore {
    async fn get(&self, domain: &str) -> Result<Option<CachedAnalysis>, StoreError> {
        Ok(self.state.lock().await.cache.get(domain).cloned())
    }

    async fn put(
        &self,
        domain: &str,
        result: &AnalysisResult,
        stored_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.state.lock().await.cache.insert(
            domain.to_owned(),
            CachedAnalysis {
                result: result.clone(),
                stored_at,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl UsageLedger for MemoryStore {
    async fn reserve_bulk_domains(
        &self,
        caller_id: &str,
        count: u32,
        cap: u32,
        today: NaiveDate,
    ) -> Result<QuotaReservation, StoreError> {
        let mut state = self.state.lock().await;
        let Some(usage) = state.callers.get_mut(caller_id) else {
            return Ok(QuotaReservation::UnknownCaller);
        };

        let used = if usage.last_reset == Some(today) {
            usage.domains_today
        } else {
            0
        };
        let next = used.saturating_add(count);
        if next > cap {
            return Ok(QuotaReservation::Exceeded { used });
        }

        usage.domains_today = next;
        usage.last_reset = Some(today);
        Ok(QuotaReservation::Reserved { used: next })
    }

    async fn admit_guest(
        &self,
        guest_key: &str,
        limit: u32,
        today: NaiveDate,
    ) -> Result<GuestAdmission, StoreError> {
        let mut state = self.state.lock().await;
        let usage = state
            .guests
            .entry(guest_key.to_owned())
            .or_insert(GuestUsage {
                checks_today: 0,
                usage_date: today,
            });

        if usage.usage_date != today {
            usage.checks_today = 0;
            usage.usage_date = today;
        }
        if usage.checks_today >= limit {
            return Ok(GuestAdmission::LimitReached);
        }

        usage.checks_today += 1;
        Ok(GuestAdmission::Admitted {
            used: usage.checks_today,
        })
    }
}

#[async_trait]
impl StoreMaintenance for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn purge_stale_cache(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.cache.len();
        state.cache.retain(|_, entry| entry.stored_at >= older_than);
        Ok((before - state.cache.len()) as u64)
    }

    async fn purge_guest_usage(&self, before: NaiveDate) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let count = state.guests.len();
        state.guests.retain(|_, usage| usage.usage_date >= before);
        Ok((count - state.guests.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn unknown_caller_is_reported() {
        let store = MemoryStore::new();
        let outcome = store
            .reserve_bulk_domains("ghost", 1, 500, day(1))
            .await
            .unwrap();
        assert_eq!(outcome, QuotaReservation::UnknownCaller);
    }

    #[tokio::test]
    async fn reservation_accumulates_up_to_cap() {
        let store = MemoryStore::new();
        store.register_caller("u1").await;

        assert_eq!(
            store.reserve_bulk_domains("u1", 20, 25, day(1)).await.unwrap(),
            QuotaReservation::Reserved { used: 20 }
        );
        assert_eq!(
            store.reserve_bulk_domains("u1", 5, 25, day(1)).await.unwrap(),
            QuotaReservation::Reserved { used: 25 }
        );
        assert_eq!(
            store.reserve_bulk_domains("u1", 1, 25, day(1)).await.unwrap(),
            QuotaReservation::Exceeded { used: 25 }
        );
        assert_eq!(store.bulk_usage("u1", day(1)).await, Some(25));
    }

    #[tokio::test]
    async fn new_day_resets_bulk_counter() {
        let store = MemoryStore::new();
        store.register_caller("u1").await;
        store.reserve_bulk_domains("u1", 500, 500, day(1)).await.unwrap();

        assert_eq!(
            store.reserve_bulk_domains("u1", 10, 500, day(2)).await.unwrap(),
            QuotaReservation::Reserved { used: 10 }
        );
        assert_eq!(store.bulk_usage("u1", day(1)).await, Some(0));
    }

    #[tokio::test]
    async fn guest_admission_stops_at_limit_and_resets_daily() {
        let store = MemoryStore::new();
        for expected in 1..=3 {
            assert_eq!(
                store.admit_guest("g", 3, day(1)).await.unwrap(),
                GuestAdmission::Admitted { used: expected }
            );
        }
        assert_eq!(
            store.admit_guest("g", 3, day(1)).await.unwrap(),
            GuestAdmission::LimitReached
        );
        assert_eq!(
            store.admit_guest("g", 3, day(2)).await.unwrap(),
            GuestAdmission::Admitted { used: 1 }
        );
    }

    #[tokio::test]
    async fn purges_remove_only_old_rows() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let result = AnalysisResult::failed("a.com", "x");
        store.put("old.com", &result, now - TimeDelta::hours(48)).await.unwrap();
        store.put("new.com", &result, now).await.unwrap();
        store.admit_guest("old", 3, day(1)).await.unwrap();
        store.admit_guest("new", 3, day(5)).await.unwrap();

        let purged = store
            .purge_stale_cache(now - TimeDelta::hours(24))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(store.get("old.com").await.unwrap().is_none());
        assert!(store.get("new.com").await.unwrap().is_some());

        assert_eq!(store.purge_guest_usage(day(5)).await.unwrap(), 1);
    }
}
