//! Fraud check API handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{FraudCheckResponse, TransactionRequest};
use crate::services::FraudEngine;

/// POST /api/v1.0/fraud/check - Score a transaction and record it
pub async fn check_fraud(
    State(engine): State<Arc<FraudEngine>>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> ApiResult<Json<FraudCheckResponse>> {
    let start = Instant::now();
    let Json(txn) = payload?;

    if !txn.has_positive_amount() {
        return Err(ApiError::ValidationError(
            "Amount must be greater than 0".to_string(),
        ));
    }
    txn.validate()?;

    // One instant for both scoring and recording
    let now = engine.now();
    let result = engine.score_transaction(&txn, now).await;
    engine.record_transaction(&txn, now).await;

    let elapsed = start.elapsed();

    tracing::info!(
        account_id = %txn.account_id,
        amount = txn.amount,
        transaction_type = %txn.transaction_type,
        risk_score = result.risk_score,
        decision = %result.decision,
        flags = ?result.flags,
        duration_ms = %elapsed.as_millis(),
        "Fraud check completed"
    );

    Ok(Json(FraudCheckResponse {
        result,
        processing_time_ms: format!("{}ms", elapsed.as_millis()),
    }))
}
