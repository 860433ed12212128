//! Decision engine
//!
//! Maps a total risk score onto a decision, a recommended action and a
//! human-readable reason, plus a confidence value. Both mappings are ordered
//! threshold tables scanned from the most severe tier down.

use serde::{Deserialize, Serialize};

/// Outcome of a fraud check, ordered by increasing severity
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Challenge,
    Flag,
    Block,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "APPROVE",
            Decision::Challenge => "CHALLENGE",
            Decision::Flag => "FLAG",
            Decision::Block => "BLOCK",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the calling system should do with the transaction
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    Proceed,
    ProceedWithLogging,
    #[serde(rename = "REQUIRE_2FA")]
    Require2fa,
    ManualReview,
    RejectTransaction,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::Proceed => "PROCEED",
            RecommendedAction::ProceedWithLogging => "PROCEED_WITH_LOGGING",
            RecommendedAction::Require2fa => "REQUIRE_2FA",
            RecommendedAction::ManualReview => "MANUAL_REVIEW",
            RecommendedAction::RejectTransaction => "REJECT_TRANSACTION",
        }
    }

    /// Reason text for a given score
    fn reason(&self, score: u32) -> String {
        match self {
            RecommendedAction::RejectTransaction => format!(
                "Critical fraud risk detected (score: {}). Multiple suspicious patterns identified.",
                score
            ),
            RecommendedAction::ManualReview => format!(
                "High fraud risk detected (score: {}). Transaction flagged for manual review.",
                score
            ),
            RecommendedAction::Require2fa => format!(
                "Moderate risk detected (score: {}). Additional verification recommended.",
                score
            ),
            RecommendedAction::ProceedWithLogging => format!(
                "Low risk detected (score: {}). Transaction approved with monitoring.",
                score
            ),
            RecommendedAction::Proceed => "Transaction appears normal".to_string(),
        }
    }
}

/// Decision, action and reason for one score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub action: RecommendedAction,
    pub reason: String,
}

/// Inclusive lower bounds, most severe first. A score of 0 matches nothing.
pub const DECISION_THRESHOLDS: &[(u32, Decision, RecommendedAction)] = &[
    (80, Decision::Block, RecommendedAction::RejectTransaction),
    (50, Decision::Flag, RecommendedAction::ManualReview),
    (40, Decision::Challenge, RecommendedAction::Require2fa),
    (1, Decision::Approve, RecommendedAction::ProceedWithLogging),
];

/// Inclusive lower bounds for confidence. Not monotonic: a clean score of 0
/// reports [`CLEAN_CONFIDENCE`], above the 1..=39 band.
pub const CONFIDENCE_THRESHOLDS: &[(u32, f64)] = &[(80, 0.95), (60, 0.85), (40, 0.75), (1, 0.60)];

pub const CLEAN_CONFIDENCE: f64 = 0.90;

pub fn decide(score: u32) -> Verdict {
    let (decision, action) = DECISION_THRESHOLDS
        .iter()
        .find(|(min, _, _)| score >= *min)
        .map(|(_, decision, action)| (*decision, *action))
        .unwrap_or((Decision::Approve, RecommendedAction::Proceed));

    Verdict {
        decision,
        action,
        reason: action.reason(score),
    }
}

pub fn confidence(score: u32) -> f64 {
    CONFIDENCE_THRESHOLDS
        .iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, confidence)| *confidence)
        .unwrap_or(CLEAN_CONFIDENCE)
}
