//! Fraud scoring services

pub mod decision;
pub mod fraud_engine;
pub mod rules;
pub mod velocity;

pub use decision::{Decision, RecommendedAction};
pub use fraud_engine::{FraudEngine, FraudResult, RiskBreakdown, RiskFlag};
pub use velocity::{VelocitySnapshot, VelocityTracker, VelocityWindow};
