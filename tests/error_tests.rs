// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;
use study_tracker::error::AppError;
use study_tracker::services::timestamp_guard::TimestampRejection;

async fn render(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_only_database_errors_are_retryable() {
    assert!(AppError::Database("deadline exceeded".to_string()).is_retryable());

    assert!(!AppError::NoFreezeTokens.is_retryable());
    assert!(!AppError::TimezoneLocked.is_retryable());
    assert!(!AppError::NotFound("User".to_string()).is_retryable());
    assert!(!AppError::Internal(anyhow::anyhow!("boom")).is_retryable());
}

#[tokio::test]
async fn test_timestamp_rejections_use_their_own_codes() {
    let (status, body) = render(TimestampRejection::BackfillTooOld.into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "backfill_too_old");
    assert_eq!(body["details"], "Cannot backfill events older than 24h");

    let (status, body) = render(TimestampRejection::InvalidTimestamp.into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_timestamp");
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let (status, body) = render(AppError::Database("secret connection string".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (status, body) = render(AppError::TextGeneration("HTTP 503".into())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_client_errors_status_codes() {
    let (status, body) = render(AppError::TimezoneLocked).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "timezone_locked");

    let (status, body) = render(AppError::NoFreezeTokens).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_freeze_tokens");

    let (status, body) = render(AppError::Unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("details").is_none());
}
