use serde::{Deserialize, Serialize};

/// Verdict returned by an external risk analyzer for a target mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub is_safe: bool,
    pub risks: Vec<String>,
}

impl RiskAssessment {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            risks: Vec::new(),
        }
    }

    pub fn unsafe_with(risks: Vec<String>) -> Self {
        Self {
            is_safe: false,
            risks,
        }
    }
}
