//! Clients for the third-party services an analysis consults: the authority
//! metrics provider and the text-generation backend that phrases insights.

pub mod authority;
pub mod error;
pub mod insight;

pub use authority::{AuthorityClient, AuthorityMetrics};
pub use error::UpstreamError;
pub use insight::{fallback_insight, insight_prompt, InsightClient, InsightSettings};
