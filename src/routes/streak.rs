// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Streak routes: activity logging, streak status, freeze tokens, timezone.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityEvent, EventMetadata, EventType};
use crate::routes::ValidatedJson;
use crate::services::streak::NewEvent;
use crate::services::timestamp_guard::TimestampRejection;
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Streak routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/streak", get(get_streak))
        .route("/api/streak/events", post(log_event))
        .route("/api/streak/freeze", post(use_freeze))
        .route("/api/streak/timezone", post(set_timezone))
}

// ─── Activity Events ─────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LogEventRequest {
    #[serde(rename = "type")]
    event_type: EventType,
    /// RFC3339; server time when absent
    #[serde(default)]
    occurred_at: Option<String>,
    #[serde(default)]
    metadata: EventMetadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub occurred_at: String,
    pub metadata: EventMetadata,
}

impl From<ActivityEvent> for EventResponse {
    fn from(event: ActivityEvent) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            occurred_at: format_utc_rfc3339(event.occurred_at),
            metadata: event.metadata,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogEventResponse {
    pub event: EventResponse,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Log a study activity and return the recomputed streak.
async fn log_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<LogEventRequest>,
) -> Result<(StatusCode, Json<LogEventResponse>)> {
    if !body.event_type.is_client_loggable() {
        return Err(AppError::BadRequest(format!(
            "Unsupported event type: {}",
            body.event_type.as_str()
        )));
    }

    let occurred_at = body
        .occurred_at
        .as_deref()
        .map(|raw| parse_rfc3339(raw).ok_or(TimestampRejection::InvalidTimestamp))
        .transpose()?;

    let logged = state
        .streak_service
        .log_event(
            &user.user_id,
            NewEvent {
                event_type: body.event_type,
                occurred_at,
                metadata: body.metadata,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LogEventResponse {
            event: logged.event.into(),
            current_streak: logged.summary.current_streak,
            longest_streak: logged.summary.longest_streak,
        }),
    ))
}

// ─── Streak Status ───────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakResponse {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<String>,
    pub timezone: Option<String>,
    pub freeze_tokens: u32,
}

/// Current streak, recomputed from the activity log.
async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StreakResponse>> {
    let status = state.streak_service.get_streak(&user.user_id).await?;

    tracing::debug!(
        user_id = %user.user_id,
        current_streak = status.summary.current_streak,
        "Fetched streak"
    );

    Ok(Json(StreakResponse {
        current_streak: status.summary.current_streak,
        longest_streak: status.summary.longest_streak,
        last_active_date: status.last_active_date,
        timezone: status.timezone,
        freeze_tokens: status.freeze_tokens,
    }))
}

// ─── Freeze Tokens ───────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FreezeResponse {
    pub message: String,
    pub freeze_tokens: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Spend a freeze token to keep today's streak alive.
async fn use_freeze(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FreezeResponse>> {
    let outcome = state.streak_service.use_freeze_token(&user.user_id).await?;

    Ok(Json(FreezeResponse {
        message: "Freeze token used".to_string(),
        freeze_tokens: outcome.remaining_tokens,
        current_streak: outcome.summary.current_streak,
        longest_streak: outcome.summary.longest_streak,
    }))
}

// ─── Timezone ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct TimezoneRequest {
    #[validate(length(min = 1, max = 64))]
    timezone: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TimezoneResponse {
    pub message: String,
    pub timezone: String,
}

/// Set the user's timezone. Allowed once; later calls get 409.
async fn set_timezone(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<TimezoneRequest>,
) -> Result<Json<TimezoneResponse>> {
    let timezone = state
        .streak_service
        .set_timezone(&user.user_id, &body.timezone)
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::TimezoneLocked) {
                tracing::info!(user_id = %user.user_id, "Timezone change refused, already locked");
            }
        })?;

    tracing::info!(user_id = %user.user_id, timezone = %timezone, "Timezone set and locked");

    Ok(Json(TimezoneResponse {
        message: "Timezone set".to_string(),
        timezone,
    }))
}
