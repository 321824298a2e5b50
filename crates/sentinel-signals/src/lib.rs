//! HTML risk signals for SEO Sentinel.
//!
//! Parses arbitrary markup into a document tree, evaluates a fixed, ordered
//! battery of detectors against it, and reduces the verdicts to a bounded
//! technical score that can be blended with an external authority score.

pub mod detector;
pub mod lexicon;
pub mod score;
pub mod types;

pub use detector::detect;
pub use score::{blend, severity_weight, technical_score, EXTERNAL_WEIGHT, TECHNICAL_WEIGHT};
pub use types::{Severity, Signal};
