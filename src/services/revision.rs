// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Planned revision sessions.
//!
//! A revision is a user's plan to go over one of their notes at a given
//! time. It starts out pending and is later completed or skipped.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::StudyDb;
use crate::error::{AppError, Result};
use crate::models::revision::{MAX_RATING, MIN_RATING};
use crate::models::{Revision, RevisionStatus};
use crate::time_utils::Clock;

/// A revision to be created.
#[derive(Debug, Clone)]
pub struct NewRevision {
    pub note_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: Option<RevisionStatus>,
    pub rating: Option<u8>,
}

/// A due revision with the title of the note it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct DueRevision {
    pub revision: Revision,
    /// `None` once the note has been deleted
    pub note_title: Option<String>,
}

#[derive(Clone)]
pub struct RevisionService {
    db: StudyDb,
    clock: Arc<dyn Clock>,
}

fn check_rating(rating: Option<u8>) -> Result<()> {
    match rating {
        Some(r) if !(MIN_RATING..=MAX_RATING).contains(&r) => Err(AppError::BadRequest(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        ))),
        _ => Ok(()),
    }
}

fn not_found(revision_id: &str) -> AppError {
    AppError::NotFound(format!("Revision {} not found", revision_id))
}

impl RevisionService {
    pub fn new(db: StudyDb, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// All of the user's revisions, earliest scheduled first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Revision>> {
        self.db.list_revisions(user_id).await
    }

    /// Pending revisions scheduled no later than now, earliest first.
    pub async fn due(&self, user_id: &str) -> Result<Vec<DueRevision>> {
        let now = self.clock.now();

        let due: Vec<Revision> = self
            .db
            .list_revisions(user_id)
            .await?
            .into_iter()
            .filter(|r| r.is_due(now))
            .collect();

        if due.is_empty() {
            return Ok(Vec::new());
        }

        let titles: HashMap<String, String> = self
            .db
            .list_notes(user_id)
            .await?
            .into_iter()
            .map(|n| (n.id, n.title))
            .collect();

        Ok(due
            .into_iter()
            .map(|revision| DueRevision {
                note_title: titles.get(&revision.note_id).cloned(),
                revision,
            })
            .collect())
    }

    /// Plan a revision of one of the user's own notes.
    pub async fn create(&self, user_id: &str, new: NewRevision) -> Result<Revision> {
        check_rating(new.rating)?;

        if self.db.get_note(user_id, &new.note_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Note {} not found", new.note_id)));
        }

        let revision = Revision::new(
            user_id,
            new.note_id,
            new.scheduled_for,
            new.status.unwrap_or_default(),
            new.rating,
            self.clock.now(),
        );
        self.db.insert_revision(&revision).await?;

        tracing::info!(
            user_id,
            revision_id = %revision.id,
            note_id = %revision.note_id,
            scheduled_for = %revision.scheduled_for,
            "Revision planned"
        );
        Ok(revision)
    }

    pub async fn complete(&self, user_id: &str, revision_id: &str) -> Result<Revision> {
        let now = self.clock.now();

        let revision = self
            .db
            .update_revision(user_id, revision_id, move |r| {
                r.complete(now);
                Ok(r.clone())
            })
            .await?
            .ok_or_else(|| not_found(revision_id))?;

        tracing::info!(user_id, revision_id, "Revision completed");
        Ok(revision)
    }

    pub async fn skip(&self, user_id: &str, revision_id: &str) -> Result<Revision> {
        let now = self.clock.now();

        let revision = self
            .db
            .update_revision(user_id, revision_id, move |r| {
                r.skip(now);
                Ok(r.clone())
            })
            .await?
            .ok_or_else(|| not_found(revision_id))?;

        tracing::debug!(user_id, revision_id, "Revision skipped");
        Ok(revision)
    }
}
