//! Pick/skip verdicts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Final verdict for one candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Pick,
    Skip,
}

impl Decision {
    pub fn is_pick(self) -> bool {
        matches!(self, Decision::Pick)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Pick => write!(f, "pick"),
            Decision::Skip => write!(f, "skip"),
        }
    }
}

/// One row of the Decision List.
///
/// Descriptive metadata is absent for candidates rejected by rules, since
/// their defects are never resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEntry {
    pub url: String,
    pub id: u64,
    pub bug: u64,
    pub decision: Decision,
    pub decision_reason: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm_score: Option<String>,
}
