//! Fraud scoring engine
//!
//! Composes the stateless rules, the velocity tracker and the decision engine
//! into one result per transaction. Scoring only reads velocity state;
//! recording the transaction is a separate call made by the caller once it has
//! a result, so a check never counts the transaction it is scoring.

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::Clock;
use crate::models::TransactionRequest;
use crate::services::decision::{self, Decision, RecommendedAction};
use crate::services::rules;
use crate::services::velocity::VelocityTracker;
use crate::store::VelocityStore;

// ============================================================================
// Data Models
// ============================================================================

/// Label for a rule condition that triggered
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    HighAmount,
    RoundAmount,
    UnusualTime,
    RapidTransactions,
    HighFrequency,
    ExcessiveHourlyTransactions,
    LargeAmountAccumulation,
    ModerateAmountAccumulation,
    MultipleRecipients,
}

impl RiskFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFlag::HighAmount => "high_amount",
            RiskFlag::RoundAmount => "round_amount",
            RiskFlag::UnusualTime => "unusual_time",
            RiskFlag::RapidTransactions => "rapid_transactions",
            RiskFlag::HighFrequency => "high_frequency",
            RiskFlag::ExcessiveHourlyTransactions => "excessive_hourly_transactions",
            RiskFlag::LargeAmountAccumulation => "large_amount_accumulation",
            RiskFlag::ModerateAmountAccumulation => "moderate_amount_accumulation",
            RiskFlag::MultipleRecipients => "multiple_recipients",
        }
    }

    /// Whether the flag comes from the velocity rules
    pub fn is_velocity(&self) -> bool {
        matches!(
            self,
            RiskFlag::RapidTransactions
                | RiskFlag::HighFrequency
                | RiskFlag::ExcessiveHourlyTransactions
                | RiskFlag::LargeAmountAccumulation
                | RiskFlag::ModerateAmountAccumulation
                | RiskFlag::MultipleRecipients
        )
    }
}

impl std::fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category contribution to the risk score. Every category is always
/// present, zero when its rule did not trigger.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskBreakdown {
    pub amount_risk: u32,
    pub pattern_risk: u32,
    pub time_risk: u32,
    pub type_risk: u32,
    pub velocity_risk: u32,
}

impl RiskBreakdown {
    pub fn total(&self) -> u32 {
        self.amount_risk + self.pattern_risk + self.time_risk + self.type_risk + self.velocity_risk
    }
}

/// Outcome of scoring one transaction
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FraudResult {
    pub risk_score: u32,
    pub decision: Decision,
    /// Confidence in the decision (0.0-1.0)
    pub confidence: f64,
    pub breakdown: RiskBreakdown,
    /// Triggered conditions in rule order
    pub flags: Vec<RiskFlag>,
    pub reason: String,
    pub recommended_action: RecommendedAction,
}

// ============================================================================
// Engine
// ============================================================================

/// Fraud scoring engine
#[derive(Clone)]
pub struct FraudEngine {
    velocity: VelocityTracker,
    clock: Arc<dyn Clock>,
}

impl FraudEngine {
    pub fn new(store: Arc<dyn VelocityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            velocity: VelocityTracker::new(store),
            clock,
        }
    }

    /// Current time as seen by the engine
    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    pub fn velocity(&self) -> &VelocityTracker {
        &self.velocity
    }

    /// Score a transaction at `now`.
    ///
    /// Never fails: an unreachable velocity store only removes the velocity
    /// contribution.
    pub async fn score_transaction(
        &self,
        txn: &TransactionRequest,
        now: DateTime<Local>,
    ) -> FraudResult {
        let mut breakdown = RiskBreakdown::default();
        let mut flags = Vec::new();

        // 1. Stateless rules
        breakdown.amount_risk = rules::amount_risk(txn.amount);
        if breakdown.amount_risk > 0 {
            flags.push(RiskFlag::HighAmount);
        }

        breakdown.pattern_risk = rules::round_amount_risk(txn.amount);
        if breakdown.pattern_risk > 0 {
            flags.push(RiskFlag::RoundAmount);
        }

        breakdown.time_risk = rules::time_risk(now.hour());
        if breakdown.time_risk > 0 {
            flags.push(RiskFlag::UnusualTime);
        }

        breakdown.type_risk = rules::type_risk(&txn.transaction_type);

        // 2. Velocity (read-only)
        let velocity = self
            .velocity
            .compute_velocity_risk(&txn.account_id, txn.amount, now)
            .await;
        breakdown.velocity_risk = velocity.risk;
        for flag in velocity.flags {
            if !flags.contains(&flag) {
                flags.push(flag);
            }
        }

        // 3. Decision
        let risk_score = breakdown.total();
        let verdict = decision::decide(risk_score);

        tracing::debug!(
            account_id = %txn.account_id,
            risk_score,
            decision = %verdict.decision,
            amount_band = rules::band(rules::AMOUNT_TIERS, txn.amount),
            pattern_band = rules::band(rules::ROUND_AMOUNT_TIERS, txn.amount.trunc() as i64),
            time_band = rules::band(rules::TIME_OF_DAY_TIERS, now.hour()),
            ?breakdown,
            "Transaction scored"
        );

        FraudResult {
            risk_score,
            decision: verdict.decision,
            confidence: decision::confidence(risk_score),
            breakdown,
            flags,
            reason: verdict.reason,
            recommended_action: verdict.action,
        }
    }

    /// Record a scored transaction into velocity state. Best effort.
    pub async fn record_transaction(&self, txn: &TransactionRequest, now: DateTime<Local>) {
        self.velocity
            .record_transaction(&txn.account_id, txn.amount, &txn.destination_account, now)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{ExpiryPolicy, InMemoryVelocityStore, UnavailableStore};
    use chrono::TimeZone;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap()
    }

    fn txn(amount: f64, transaction_type: &str) -> TransactionRequest {
        TransactionRequest {
            amount,
            account_id: "ACC-001".to_string(),
            destination_account: "ACC-900".to_string(),
            transaction_type: transaction_type.to_string(),
            timestamp: String::new(),
        }
    }

    fn engine() -> FraudEngine {
        let clock = Arc::new(ManualClock::new(noon()));
        let store = Arc::new(InMemoryVelocityStore::with_clock(
            clock.clone(),
            ExpiryPolicy::RefreshOnWrite,
        ));
        FraudEngine::new(store, clock)
    }

    #[test]
    fn test_breakdown_total() {
        let breakdown = RiskBreakdown {
            amount_risk: 15,
            pattern_risk: 15,
            time_risk: 30,
            type_risk: 10,
            velocity_risk: 40,
        };
        assert_eq!(breakdown.total(), 110);
        assert_eq!(RiskBreakdown::default().total(), 0);
    }

    #[test]
    fn test_breakdown_serializes_every_category() {
        let json = serde_json::to_value(RiskBreakdown::default()).unwrap();
        for key in [
            "amount_risk",
            "pattern_risk",
            "time_risk",
            "type_risk",
            "velocity_risk",
        ] {
            assert_eq!(json[key], 0, "missing {}", key);
        }
    }

    #[test]
    fn test_flag_labels() {
        assert_eq!(
            serde_json::to_string(&RiskFlag::ExcessiveHourlyTransactions).unwrap(),
            "\"excessive_hourly_transactions\""
        );
        assert_eq!(RiskFlag::RoundAmount.to_string(), "round_amount");
        assert!(RiskFlag::MultipleRecipients.is_velocity());
        assert!(!RiskFlag::UnusualTime.is_velocity());
    }

    #[tokio::test]
    async fn test_clean_transaction_is_approved() {
        let engine = engine();
        let result = engine.score_transaction(&txn(2_500.0, "DEPOSIT"), noon()).await;

        assert_eq!(result.risk_score, 0);
        assert_eq!(result.decision, Decision::Approve);
        assert_eq!(result.recommended_action, RecommendedAction::Proceed);
        assert_eq!(result.confidence, 0.90);
        assert!(result.flags.is_empty());
        assert_eq!(result.reason, "Transaction appears normal");
    }

    #[tokio::test]
    async fn test_stateless_flags_in_rule_order() {
        let engine = engine();
        let three_am = Local.with_ymd_and_hms(2024, 5, 14, 3, 0, 0).unwrap();
        let result = engine
            .score_transaction(&txn(1_100_000.0, "WITHDRAWAL"), three_am)
            .await;

        // 50 + 20 + 30 + 10
        assert_eq!(result.risk_score, 110);
        assert_eq!(result.decision, Decision::Block);
        assert_eq!(
            result.flags,
            vec![
                RiskFlag::HighAmount,
                RiskFlag::RoundAmount,
                RiskFlag::UnusualTime
            ]
        );
    }

    #[tokio::test]
    async fn test_scoring_does_not_record() {
        let engine = engine();
        let t = txn(1_000.0, "DEPOSIT");
        engine.score_transaction(&t, noon()).await;

        let snapshot = engine.velocity().snapshot("ACC-001", noon()).await.unwrap();
        assert_eq!(snapshot.count_1h, 0);
    }

    #[tokio::test]
    async fn test_disabled_store_scores_without_velocity() {
        let engine = FraudEngine::new(
            Arc::new(UnavailableStore::default()),
            Arc::new(ManualClock::new(noon())),
        );
        let t = txn(150_000.0, "WITHDRAWAL");
        engine.record_transaction(&t, noon()).await;

        let result = engine.score_transaction(&t, noon()).await;
        assert_eq!(result.breakdown.velocity_risk, 0);
        assert_eq!(result.risk_score, 40);
    }
}
