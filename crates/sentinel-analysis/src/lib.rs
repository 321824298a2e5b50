//! Analysis orchestration: sequences fetch, concurrent scoring, insight
//! generation, per-domain caching, quotas and windowed bulk runs.

pub mod analyzer;
pub mod error;
pub mod memory;
pub mod ports;
pub mod types;

pub use analyzer::{Analyzer, AnalyzerSettings, Collaborators};
pub use error::{AnalyzeError, BatchError, SetupError, StoreError};
pub use memory::MemoryStore;
pub use ports::{
    AnalysisCache, InsightSource, MetricsSource, PageSource, StoreMaintenance, UsageLedger,
};
pub use types::{
    AnalysisResult, AnalysisStatus, CachedAnalysis, Caller, GuestAdmission, QuotaReservation,
    ResultMetrics, FAILED_INSIGHT,
};
