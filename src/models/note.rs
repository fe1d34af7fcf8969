// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study note model, including its review schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Interval applied to notes that have never been reviewed.
pub const DEFAULT_REVIEW_INTERVAL_DAYS: u32 = 1;

fn default_review_interval() -> Option<u32> {
    Some(DEFAULT_REVIEW_INTERVAL_DAYS)
}

/// Stored note record in Firestore.
///
/// A note is "scheduled" exactly when `next_review_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Note ID (UUID, also used as document ID)
    pub id: String,
    /// Owning user
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// When the note was last reviewed
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// When the note is next due; `None` means not scheduled
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub next_review_at: Option<DateTime<Utc>>,
    /// Interval applied by the last review
    #[serde(default = "default_review_interval")]
    pub review_interval_days: Option<u32>,
    /// Number of reviews submitted
    #[serde(default)]
    pub review_count: u32,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Create an unscheduled note owned by `user_id`.
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        content: Option<String>,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            content,
            tags,
            last_reviewed_at: None,
            next_review_at: None,
            review_interval_days: default_review_interval(),
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.next_review_at.is_some()
    }

    /// Whether the note is scheduled and due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at.is_some_and(|due| due <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_new_note_is_unscheduled() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let note = Note::new("user-1", "Krebs cycle", None, vec![], now);

        assert!(!note.is_scheduled());
        assert!(!note.is_due(now));
        assert_eq!(note.review_interval_days, Some(DEFAULT_REVIEW_INTERVAL_DAYS));
        assert_eq!(note.review_count, 0);
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn test_is_due_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut note = Note::new("user-1", "Krebs cycle", None, vec![], now);
        note.next_review_at = Some(now + Duration::days(1));

        assert!(!note.is_due(now));
        assert!(note.is_due(now + Duration::days(1)));
    }
}
