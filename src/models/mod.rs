//! Wire models for the fraud detection API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::services::FraudResult;

/// Transaction submitted for a fraud check
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct TransactionRequest {
    /// Must be greater than zero
    #[serde(default)]
    pub amount: f64,

    #[serde(default)]
    #[validate(length(min = 1, message = "Account ID is required"))]
    pub account_id: String,

    #[serde(default)]
    pub destination_account: String,

    /// Free-form; unknown types are valid and carry no type risk
    #[serde(default)]
    pub transaction_type: String,

    /// Informational only. Scoring uses the service clock.
    #[serde(default)]
    pub timestamp: String,
}

impl TransactionRequest {
    pub fn has_positive_amount(&self) -> bool {
        self.amount > 0.0
    }
}

/// Response body of a fraud check
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FraudCheckResponse {
    #[serde(flatten)]
    pub result: FraudResult,

    /// Time spent handling the check, e.g. "3ms"
    pub processing_time_ms: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime_seconds: i64,
    /// Whether the velocity store answered a ping
    pub velocity_store: bool,
    pub version: String,
}

/// Service description served at the root path
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub velocity_store: String,
    pub endpoints: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let req: TransactionRequest = serde_json::from_str(r#"{"account_id":"A1"}"#).unwrap();
        assert_eq!(req.amount, 0.0);
        assert!(!req.has_positive_amount());
        assert!(req.destination_account.is_empty());
        assert!(req.transaction_type.is_empty());
    }

    #[test]
    fn test_empty_account_fails_validation() {
        let req: TransactionRequest = serde_json::from_str(r#"{"amount":10.0}"#).unwrap();
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("Account ID is required"));
    }

    #[test]
    fn test_full_request_parses() {
        let req: TransactionRequest = serde_json::from_str(
            r#"{
                "amount": 150000,
                "account_id": "ACC-001",
                "destination_account": "ACC-002",
                "transaction_type": "WITHDRAWAL",
                "timestamp": "2024-05-14T12:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(req.amount, 150_000.0);
        assert!(req.validate().is_ok());
        assert!(req.has_positive_amount());
    }
}
