// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Revision routes: plan, list and close out revision sessions.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Revision, RevisionStatus};
use crate::routes::ValidatedJson;
use crate::services::revision::{DueRevision, NewRevision};
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Revision routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/revisions", get(list_revisions).post(create_revision))
        .route("/api/revisions/due", get(due_revisions))
        .route("/api/revisions/{id}/complete", patch(complete_revision))
        .route("/api/revisions/{id}/skip", patch(skip_revision))
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RevisionResponse {
    pub id: String,
    pub note_id: String,
    /// Only filled in by the due listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_title: Option<String>,
    pub scheduled_for: String,
    pub completed_at: Option<String>,
    pub status: RevisionStatus,
    pub rating: Option<u8>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Revision> for RevisionResponse {
    fn from(revision: Revision) -> Self {
        Self {
            id: revision.id,
            note_id: revision.note_id,
            note_title: None,
            scheduled_for: format_utc_rfc3339(revision.scheduled_for),
            completed_at: revision.completed_at.map(format_utc_rfc3339),
            status: revision.status,
            rating: revision.rating,
            created_at: format_utc_rfc3339(revision.created_at),
            updated_at: format_utc_rfc3339(revision.updated_at),
        }
    }
}

impl From<DueRevision> for RevisionResponse {
    fn from(due: DueRevision) -> Self {
        Self {
            note_title: due.note_title,
            ..RevisionResponse::from(due.revision)
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateRevisionRequest {
    #[validate(length(min = 1, max = 128))]
    note_id: String,
    /// RFC 3339 instant
    scheduled_for: String,
    #[serde(default)]
    status: Option<RevisionStatus>,
    #[serde(default)]
    rating: Option<u8>,
}

async fn create_revision(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateRevisionRequest>,
) -> Result<(StatusCode, Json<RevisionResponse>)> {
    let scheduled_for = parse_rfc3339(&body.scheduled_for).ok_or_else(|| {
        AppError::BadRequest(format!("Invalid scheduledFor: {}", body.scheduled_for))
    })?;

    let revision = state
        .revisions
        .create(
            &user.user_id,
            NewRevision {
                note_id: body.note_id,
                scheduled_for,
                status: body.status,
                rating: body.rating,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(revision.into())))
}

async fn list_revisions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<RevisionResponse>>> {
    let revisions = state.revisions.list(&user.user_id).await?;
    Ok(Json(revisions.into_iter().map(RevisionResponse::from).collect()))
}

async fn due_revisions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<RevisionResponse>>> {
    let due = state.revisions.due(&user.user_id).await?;

    tracing::debug!(user_id = %user.user_id, count = due.len(), "Listed due revisions");
    Ok(Json(due.into_iter().map(RevisionResponse::from).collect()))
}

async fn complete_revision(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(revision_id): Path<String>,
) -> Result<Json<RevisionResponse>> {
    let revision = state
        .revisions
        .complete(&user.user_id, &revision_id)
        .await?;
    Ok(Json(revision.into()))
}

async fn skip_revision(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(revision_id): Path<String>,
) -> Result<Json<RevisionResponse>> {
    let revision = state.revisions.skip(&user.user_id, &revision_id).await?;
    Ok(Json(revision.into()))
}
