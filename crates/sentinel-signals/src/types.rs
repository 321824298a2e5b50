use serde::{Deserialize, Serialize};

/// Weight class of a signal. Numeric weights live in [`crate::score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// One detector's verdict for one page.
///
/// `detected = true` means the negative condition was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Stable identifier, unique within one run.
    pub id: String,
    pub name: String,
    pub detected: bool,
    pub severity: Severity,
    /// Explanation; may embed evidence such as matched keywords.
    pub description: String,
}
