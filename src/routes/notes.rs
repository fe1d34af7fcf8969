// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Note routes: CRUD, review scheduling and summaries.
//!
//! Every lookup is scoped to the authenticated user; another user's note
//! is reported exactly like a missing one.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Note;
use crate::routes::ValidatedJson;
use crate::services::text_generation::SummarySource;
use crate::services::ReviewDifficulty;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_TAGS: usize = 20;

/// Note routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/due", get(due_notes))
        .route("/api/notes/summary", post(summarize))
        .route(
            "/api/notes/{id}",
            get(get_note).put(update_note).delete(delete_note),
        )
        .route("/api/notes/{id}/review", put(review_note))
        .route("/api/notes/{id}/clear-review", put(clear_review))
}

/// Note as returned by the API.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NoteResponse {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub tags: Vec<String>,
    pub last_reviewed_at: Option<String>,
    pub next_review_at: Option<String>,
    pub review_interval_days: Option<u32>,
    pub review_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            tags: note.tags,
            last_reviewed_at: note.last_reviewed_at.map(format_utc_rfc3339),
            next_review_at: note.next_review_at.map(format_utc_rfc3339),
            review_interval_days: note.review_interval_days,
            review_count: note.review_count,
            created_at: format_utc_rfc3339(note.created_at),
            updated_at: format_utc_rfc3339(note.updated_at),
        }
    }
}

fn not_found(note_id: &str) -> AppError {
    AppError::NotFound(format!("Note {} not found", note_id))
}

fn clean_tags(tags: Vec<String>) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let cleaned: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect();

    if cleaned.len() > MAX_TAGS {
        return Err(AppError::BadRequest(format!(
            "At most {} tags are allowed",
            MAX_TAGS
        )));
    }
    Ok(cleaned)
}

fn require_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    Ok(title.to_string())
}

// ─── CRUD ────────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct CreateNoteRequest {
    #[validate(length(max = 200))]
    title: String,
    #[serde(default)]
    #[validate(length(max = 100_000))]
    content: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>)> {
    let title = require_title(&body.title)?;
    let tags = clean_tags(body.tags)?;

    let note = Note::new(&user.user_id, title, body.content, tags, state.clock.now());
    state.db.insert_note(&note).await?;

    tracing::info!(user_id = %user.user_id, note_id = %note.id, "Note created");
    Ok((StatusCode::CREATED, Json(note.into())))
}

async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<NoteResponse>>> {
    let notes = state.db.list_notes(&user.user_id).await?;

    tracing::debug!(user_id = %user.user_id, count = notes.len(), "Listed notes");
    Ok(Json(notes.into_iter().map(NoteResponse::from).collect()))
}

async fn get_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<String>,
) -> Result<Json<NoteResponse>> {
    let note = state
        .db
        .get_note(&user.user_id, &note_id)
        .await?
        .ok_or_else(|| not_found(&note_id))?;

    Ok(Json(note.into()))
}

#[derive(Deserialize, Validate)]
struct UpdateNoteRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100_000))]
    content: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>> {
    let title = body.title.as_deref().map(require_title).transpose()?;
    let tags = body.tags.map(clean_tags).transpose()?;
    let content = body.content;
    let now = state.clock.now();

    let note = state
        .db
        .update_note(&user.user_id, &note_id, move |note| {
            if let Some(title) = &title {
                note.title = title.clone();
            }
            if let Some(content) = &content {
                note.content = Some(content.clone());
            }
            if let Some(tags) = &tags {
                note.tags = tags.clone();
            }
            note.updated_at = now;
            Ok(note.clone())
        })
        .await?
        .ok_or_else(|| not_found(&note_id))?;

    tracing::info!(user_id = %user.user_id, note_id = %note.id, "Note updated");
    Ok(Json(note.into()))
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete_note(&user.user_id, &note_id).await? {
        return Err(not_found(&note_id));
    }

    tracing::info!(user_id = %user.user_id, note_id = %note_id, "Note deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ─── Review Scheduling ───────────────────────────────────────

async fn due_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<NoteResponse>>> {
    let notes = state.review_scheduler.due_notes(&user.user_id).await?;
    Ok(Json(notes.into_iter().map(NoteResponse::from).collect()))
}

#[derive(Deserialize, Validate)]
struct ReviewRequest {
    difficulty: ReviewDifficulty,
}

async fn review_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<String>,
    ValidatedJson(body): ValidatedJson<ReviewRequest>,
) -> Result<Json<NoteResponse>> {
    let note = state
        .review_scheduler
        .submit_review(&user.user_id, &note_id, body.difficulty)
        .await?;

    Ok(Json(note.into()))
}

async fn clear_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<String>,
) -> Result<Json<NoteResponse>> {
    let note = state
        .review_scheduler
        .clear_from_schedule(&user.user_id, &note_id)
        .await?;

    Ok(Json(note.into()))
}

// ─── Summaries ───────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct SummaryRequest {
    #[validate(length(min = 1, max = 100_000))]
    content: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SummaryResponse {
    pub summary: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "\"provider\" | \"local\""))]
    pub source: SummarySource,
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<SummaryRequest>,
) -> Result<Json<SummaryResponse>> {
    if body.content.trim().is_empty() {
        return Err(AppError::BadRequest("Content is required".to_string()));
    }

    let summary = state.text_generation.summarize(&body.content).await;

    tracing::debug!(
        user_id = %user.user_id,
        source = ?summary.source,
        "Generated summary"
    );

    Ok(Json(SummaryResponse {
        summary: summary.text,
        source: summary.source,
    }))
}
