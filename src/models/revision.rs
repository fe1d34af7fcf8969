// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Planned revision sessions for a note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Lowest and highest self-assessed recall quality.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Where a revision stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum RevisionStatus {
    #[default]
    Pending,
    Completed,
    Skipped,
}

/// Stored revision record in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// Revision ID (UUID, also used as document ID)
    pub id: String,
    pub user_id: String,
    /// Note being revised; owned by `user_id`
    pub note_id: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub scheduled_for: DateTime<Utc>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: RevisionStatus,
    /// Recall quality, `MIN_RATING..=MAX_RATING`
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Revision {
    pub fn new(
        user_id: impl Into<String>,
        note_id: impl Into<String>,
        scheduled_for: DateTime<Utc>,
        status: RevisionStatus,
        rating: Option<u8>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            note_id: note_id.into(),
            scheduled_for,
            completed_at: (status == RevisionStatus::Completed).then_some(now),
            status,
            rating,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending and scheduled no later than `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == RevisionStatus::Pending && self.scheduled_for <= now
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = RevisionStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    pub fn skip(&mut self, now: DateTime<Utc>) {
        self.status = RevisionStatus::Skipped;
        self.updated_at = now;
    }
}
