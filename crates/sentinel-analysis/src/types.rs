use chrono::{DateTime, TimeDelta, Utc};
use sentinel_signals::Signal;
use serde::{Deserialize, Serialize};

/// Headline numbers for one analyzed domain.
///
/// `spam_score` is the blended score, always within `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetrics {
    pub da: i32,
    pub pa: i32,
    pub backlinks: i64,
    pub spam_score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    Failed,
}

/// Outcome of analyzing one domain.
///
/// `cached` is only set by the bulk flow; `error` only on failed entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub domain: String,
    pub metrics: ResultMetrics,
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub insight: String,
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Insight text carried by entries that could not be analyzed.
pub const FAILED_INSIGHT: &str =
    "This entry could not be analyzed, so no risk assessment is available.";

impl AnalysisResult {
    /// A zero-scored entry for input that could not be analyzed at all.
    #[must_use]
    pub fn failed(domain: &str, error: impl Into<String>) -> Self {
        Self {
            domain: domain.to_owned(),
            metrics: ResultMetrics::default(),
            signals: Vec::new(),
            insight: FAILED_INSIGHT.to_owned(),
            status: AnalysisStatus::Failed,
            cached: None,
            error: Some(error.into()),
        }
    }
}

/// A stored result and the moment it was computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAnalysis {
    pub result: AnalysisResult,
    pub stored_at: DateTime<Utc>,
}

impl CachedAnalysis {
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now.signed_duration_since(self.stored_at) < ttl
    }
}

/// Who is asking for a single analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// Signed-in caller, identified by an opaque id. Not rate limited.
    Member(String),
    /// Anonymous caller, identified by a hashed client address.
    Guest(String),
}

/// Result of trying to reserve bulk-domain budget for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaReservation {
    /// Budget was reserved; `used` is today's total including this batch.
    Reserved { used: u32 },
    /// Reserving would exceed the cap; `used` is today's total so far.
    Exceeded { used: u32 },
    UnknownCaller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestAdmission {
    /// The check was counted; `used` is today's total including it.
    Admitted { used: u32 },
    LimitReached,
}
