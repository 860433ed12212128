//! Velocity tracking over fixed-expiry windows
//!
//! Per-account aggregates live in the velocity store under
//! `fraud:velocity:*` keys. A window is a set of keys that expire together
//! `window_length` after they are armed (see [`ExpiryPolicy`]), so counts reset
//! at expiry rather than sliding. Near a reset the aggregates can under- or
//! over-count; that approximation is accepted for a real-time check.
//!
//! [`ExpiryPolicy`]: crate::store::ExpiryPolicy

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::services::fraud_engine::RiskFlag;
use crate::store::{StoreResult, VelocityStore};

// ============================================================================
// Thresholds
// ============================================================================

/// 10-minute count at or above which transactions are "rapid"
const RAPID_COUNT_10M: i64 = 10;
const RAPID_RISK: u32 = 40;

/// 10-minute count at or above which frequency is "high"
const HIGH_FREQUENCY_COUNT_10M: i64 = 5;
const HIGH_FREQUENCY_RISK: u32 = 25;

const EXCESSIVE_COUNT_1H: i64 = 20;
const EXCESSIVE_HOURLY_RISK: u32 = 30;

/// Projected 1-hour volume (history + current) strictly above which risk applies
const LARGE_ACCUMULATION: f64 = 5_000_000.0;
const LARGE_ACCUMULATION_RISK: u32 = 35;
const MODERATE_ACCUMULATION: f64 = 2_000_000.0;
const MODERATE_ACCUMULATION_RISK: u32 = 20;

const MULTIPLE_RECIPIENTS_1H: u64 = 10;
const MULTIPLE_RECIPIENTS_RISK: u32 = 25;

// ============================================================================
// Windows and keys
// ============================================================================

/// Lookback windows tracked per account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VelocityWindow {
    TenMinutes,
    OneHour,
}

impl VelocityWindow {
    pub const ALL: [VelocityWindow; 2] = [VelocityWindow::TenMinutes, VelocityWindow::OneHour];

    pub fn label(&self) -> &'static str {
        match self {
            VelocityWindow::TenMinutes => "10m",
            VelocityWindow::OneHour => "1h",
        }
    }

    pub fn length(&self) -> Duration {
        match self {
            VelocityWindow::TenMinutes => Duration::from_secs(10 * 60),
            VelocityWindow::OneHour => Duration::from_secs(60 * 60),
        }
    }
}

/// Store key namespace
pub struct VelocityKeys;

impl VelocityKeys {
    pub fn count(window: VelocityWindow, account_id: &str) -> String {
        format!("fraud:velocity:count:{}:{}", window.label(), account_id)
    }

    /// Amount history is only kept for the 1-hour window
    pub fn amount_history(account_id: &str) -> String {
        format!(
            "fraud:velocity:amount:{}:{}",
            VelocityWindow::OneHour.label(),
            account_id
        )
    }

    /// Recipient set is only kept for the 1-hour window
    pub fn recipients(account_id: &str) -> String {
        format!(
            "fraud:velocity:recipients:{}:{}",
            VelocityWindow::OneHour.label(),
            account_id
        )
    }
}

/// Amount-history members carry a unique suffix so equal amounts recorded
/// within the same window are all kept.
fn encode_amount_member(amount: f64) -> String {
    format!("{:.2}:{}", amount, Uuid::new_v4().simple())
}

fn decode_amount_member(member: &str) -> Option<f64> {
    member.split(':').next()?.parse::<f64>().ok()
}

// ============================================================================
// Aggregates
// ============================================================================

/// Aggregates read from the store for one account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VelocitySnapshot {
    pub count_10m: i64,
    pub count_1h: i64,
    /// Sum of recorded amounts scored within the last hour
    pub amount_1h: f64,
    pub recipients_1h: u64,
}

/// Velocity contribution to a fraud check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VelocityAssessment {
    pub risk: u32,
    pub flags: Vec<RiskFlag>,
}

impl VelocityAssessment {
    fn add(&mut self, risk: u32, flag: RiskFlag) {
        self.risk += risk;
        self.flags.push(flag);
    }
}

/// Score a snapshot. `current_amount` is added to the hourly volume because the
/// check looks at the state after the transaction under review completes.
pub fn assess(snapshot: &VelocitySnapshot, current_amount: f64) -> VelocityAssessment {
    let mut assessment = VelocityAssessment::default();

    if snapshot.count_10m >= RAPID_COUNT_10M {
        assessment.add(RAPID_RISK, RiskFlag::RapidTransactions);
    } else if snapshot.count_10m >= HIGH_FREQUENCY_COUNT_10M {
        assessment.add(HIGH_FREQUENCY_RISK, RiskFlag::HighFrequency);
    }

    if snapshot.count_1h >= EXCESSIVE_COUNT_1H {
        assessment.add(EXCESSIVE_HOURLY_RISK, RiskFlag::ExcessiveHourlyTransactions);
    }

    // Only accounts with recorded volume in the window can accumulate
    if snapshot.amount_1h > 0.0 {
        let projected = snapshot.amount_1h + current_amount;
        if projected > LARGE_ACCUMULATION {
            assessment.add(LARGE_ACCUMULATION_RISK, RiskFlag::LargeAmountAccumulation);
        } else if projected > MODERATE_ACCUMULATION {
            assessment.add(MODERATE_ACCUMULATION_RISK, RiskFlag::ModerateAmountAccumulation);
        }
    }

    if snapshot.recipients_1h >= MULTIPLE_RECIPIENTS_1H {
        assessment.add(MULTIPLE_RECIPIENTS_RISK, RiskFlag::MultipleRecipients);
    }

    assessment
}

// ============================================================================
// Tracker
// ============================================================================

/// Sole reader and writer of per-account window state
#[derive(Clone)]
pub struct VelocityTracker {
    store: Arc<dyn VelocityStore>,
}

impl VelocityTracker {
    pub fn new(store: Arc<dyn VelocityStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn VelocityStore> {
        &self.store
    }

    /// Record a completed transaction into every tracked window.
    ///
    /// Best effort: a store failure is logged and dropped, it never fails the
    /// request that triggered it.
    pub async fn record_transaction(
        &self,
        account_id: &str,
        amount: f64,
        destination_account: &str,
        now: DateTime<Local>,
    ) {
        if let Err(e) = self
            .try_record(account_id, amount, destination_account, now)
            .await
        {
            tracing::warn!(
                account_id = %account_id,
                backend = self.store.backend(),
                error = %e,
                "Velocity record dropped"
            );
        }
    }

    async fn try_record(
        &self,
        account_id: &str,
        amount: f64,
        destination_account: &str,
        now: DateTime<Local>,
    ) -> StoreResult<()> {
        for window in VelocityWindow::ALL {
            self.store
                .increment_with_expiry(&VelocityKeys::count(window, account_id), window.length())
                .await?;
        }

        let hour = VelocityWindow::OneHour;
        self.store
            .add_timed_entry(
                &VelocityKeys::amount_history(account_id),
                now.timestamp() as f64,
                &encode_amount_member(amount),
                hour.length(),
            )
            .await?;

        if !destination_account.is_empty() {
            self.store
                .add_to_set(
                    &VelocityKeys::recipients(account_id),
                    destination_account,
                    hour.length(),
                )
                .await?;
        }

        Ok(())
    }

    /// Read the current aggregates for an account.
    ///
    /// The four reads are independent; under concurrent writes they may
    /// reflect slightly different instants.
    pub async fn snapshot(
        &self,
        account_id: &str,
        now: DateTime<Local>,
    ) -> StoreResult<VelocitySnapshot> {
        let count_10m = self
            .store
            .counter(&VelocityKeys::count(VelocityWindow::TenMinutes, account_id))
            .await?;
        let count_1h = self
            .store
            .counter(&VelocityKeys::count(VelocityWindow::OneHour, account_id))
            .await?;

        let cutoff = now.timestamp() - VelocityWindow::OneHour.length().as_secs() as i64;
        let members = self
            .store
            .range_by_score(
                &VelocityKeys::amount_history(account_id),
                cutoff as f64,
                f64::INFINITY,
            )
            .await?;
        let amount_1h: f64 = members
            .iter()
            .filter_map(|member| {
                let parsed = decode_amount_member(member);
                if parsed.is_none() {
                    tracing::debug!(member = %member, "Skipping unparsable amount entry");
                }
                parsed
            })
            .sum();

        let recipients_1h = self
            .store
            .set_cardinality(&VelocityKeys::recipients(account_id))
            .await?;

        Ok(VelocitySnapshot {
            count_10m,
            count_1h,
            amount_1h,
            recipients_1h,
        })
    }

    /// Velocity risk for a transaction under review. Read-only.
    ///
    /// If the store cannot answer, velocity contributes nothing.
    pub async fn compute_velocity_risk(
        &self,
        account_id: &str,
        current_amount: f64,
        now: DateTime<Local>,
    ) -> VelocityAssessment {
        let snapshot = match self.snapshot(account_id, now).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    account_id = %account_id,
                    backend = self.store.backend(),
                    error = %e,
                    "Velocity store unavailable, scoring without velocity"
                );
                return VelocityAssessment::default();
            }
        };

        let assessment = assess(&snapshot, current_amount);

        for flag in &assessment.flags {
            match flag {
                RiskFlag::RapidTransactions => tracing::warn!(
                    account_id = %account_id,
                    count_10m = snapshot.count_10m,
                    "Velocity alert: rapid transactions"
                ),
                RiskFlag::ExcessiveHourlyTransactions => tracing::warn!(
                    account_id = %account_id,
                    count_1h = snapshot.count_1h,
                    "Velocity alert: excessive hourly transactions"
                ),
                RiskFlag::LargeAmountAccumulation => tracing::warn!(
                    account_id = %account_id,
                    amount_1h = snapshot.amount_1h,
                    "Velocity alert: large amount accumulation"
                ),
                RiskFlag::MultipleRecipients => tracing::warn!(
                    account_id = %account_id,
                    recipients_1h = snapshot.recipients_1h,
                    "Velocity alert: multiple recipients"
                ),
                _ => {}
            }
        }

        assessment
    }
}
