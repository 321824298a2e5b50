use sentinel_core::DomainError;
use sentinel_fetcher::FetchError;
use sentinel_upstream::UpstreamError;
use thiserror::Error;

/// Failure reported by a cache or usage-ledger backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored record exists but could not be decoded.
    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Terminal outcomes of a single-domain analysis.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Daily guest limit of {limit} checks reached. Sign in to continue.")]
    GuestLimitReached { limit: u32 },

    /// The target could not be fetched. `status` is the target's HTTP status
    /// when it answered with one.
    #[error("Failed to reach site: {message}")]
    Unreachable {
        status: Option<u16>,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for AnalyzeError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Empty => Self::MissingUrl,
            DomainError::Invalid { .. } => Self::InvalidUrl(err.to_string()),
        }
    }
}

/// Outcomes that refuse a bulk request before any entry is analyzed.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Authentication required")]
    MissingCaller,

    #[error("Invalid URL list")]
    InvalidList,

    #[error("Maximum {max} domains per batch")]
    TooManyDomains { max: usize },

    #[error("User not found")]
    UnknownCaller,

    #[error("Daily limit reached: {cap} domains per day ({used} used today)")]
    QuotaExceeded { used: u32, cap: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure while building the live HTTP collaborators.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("building HTML fetcher: {0}")]
    Fetcher(#[from] FetchError),

    #[error("building authority client: {0}")]
    Authority(#[source] UpstreamError),

    #[error("building insight client: {0}")]
    Insight(#[source] UpstreamError),
}
