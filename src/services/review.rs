// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spaced-repetition scheduling for notes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::StudyDb;
use crate::error::{AppError, Result};
use crate::models::Note;
use crate::time_utils::Clock;

/// How hard the user found a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ReviewDifficulty {
    Hard,
    Medium,
    Easy,
}

impl ReviewDifficulty {
    /// Days until the next review.
    pub fn interval_days(self) -> u32 {
        match self {
            ReviewDifficulty::Hard => 1,
            ReviewDifficulty::Medium => 3,
            ReviewDifficulty::Easy => 7,
        }
    }
}

/// Record a completed review and schedule the next one.
pub fn apply_review(note: &mut Note, difficulty: ReviewDifficulty, now: DateTime<Utc>) {
    let interval = difficulty.interval_days();

    note.last_reviewed_at = Some(now);
    note.next_review_at = Some(now + Duration::days(i64::from(interval)));
    note.review_interval_days = Some(interval);
    note.review_count += 1;
    note.updated_at = now;
}

/// Take a note off the review schedule. History is kept.
pub fn clear_schedule(note: &mut Note, now: DateTime<Utc>) {
    if note.next_review_at.is_none() && note.review_interval_days.is_none() {
        return;
    }
    note.next_review_at = None;
    note.review_interval_days = None;
    note.updated_at = now;
}

/// Applies review decisions to stored notes.
#[derive(Clone)]
pub struct ReviewScheduler {
    db: StudyDb,
    clock: Arc<dyn Clock>,
}

impl ReviewScheduler {
    pub fn new(db: StudyDb, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn submit_review(
        &self,
        user_id: &str,
        note_id: &str,
        difficulty: ReviewDifficulty,
    ) -> Result<Note> {
        let now = self.clock.now();

        let note = self
            .db
            .update_note(user_id, note_id, move |note| {
                apply_review(note, difficulty, now);
                Ok(note.clone())
            })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note {} not found", note_id)))?;

        tracing::info!(
            user_id,
            note_id,
            ?difficulty,
            review_count = note.review_count,
            "Note reviewed"
        );

        Ok(note)
    }

    pub async fn clear_from_schedule(&self, user_id: &str, note_id: &str) -> Result<Note> {
        let now = self.clock.now();

        let note = self
            .db
            .update_note(user_id, note_id, move |note| {
                clear_schedule(note, now);
                Ok(note.clone())
            })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note {} not found", note_id)))?;

        tracing::debug!(user_id, note_id, "Note removed from review schedule");
        Ok(note)
    }

    /// Scheduled notes whose review time has passed, soonest first.
    pub async fn due_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let now = self.clock.now();

        let mut due: Vec<Note> = self
            .db
            .list_notes(user_id)
            .await?
            .into_iter()
            .filter(|n| n.is_due(now))
            .collect();

        due.sort_by_key(|n| n.next_review_at);
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    fn fresh_note() -> Note {
        Note::new("user-1", "Cell biology", None, vec![], now() - Duration::days(2))
    }

    #[test]
    fn test_interval_table() {
        assert_eq!(ReviewDifficulty::Hard.interval_days(), 1);
        assert_eq!(ReviewDifficulty::Medium.interval_days(), 3);
        assert_eq!(ReviewDifficulty::Easy.interval_days(), 7);
    }

    #[test]
    fn test_apply_review_schedules_next() {
        let mut note = fresh_note();
        apply_review(&mut note, ReviewDifficulty::Medium, now());

        assert_eq!(note.last_reviewed_at, Some(now()));
        assert_eq!(note.next_review_at, Some(now() + Duration::days(3)));
        assert_eq!(note.review_interval_days, Some(3));
        assert_eq!(note.review_count, 1);
        assert_eq!(note.updated_at, now());
    }

    #[test]
    fn test_review_count_accumulates() {
        let mut note = fresh_note();
        apply_review(&mut note, ReviewDifficulty::Easy, now());
        apply_review(&mut note, ReviewDifficulty::Hard, now() + Duration::days(7));

        assert_eq!(note.review_count, 2);
        assert_eq!(note.review_interval_days, Some(1));
        assert_eq!(note.next_review_at, Some(now() + Duration::days(8)));
    }

    #[test]
    fn test_clear_is_idempotent_and_keeps_history() {
        let mut note = fresh_note();
        apply_review(&mut note, ReviewDifficulty::Hard, now());

        let later = now() + Duration::hours(1);
        clear_schedule(&mut note, later);
        let once = note.clone();
        clear_schedule(&mut note, later + Duration::hours(1));

        assert_eq!(note, once);
        assert_eq!(note.next_review_at, None);
        assert_eq!(note.review_interval_days, None);
        assert_eq!(note.review_count, 1);
        assert_eq!(note.last_reviewed_at, Some(now()));
    }

    #[test]
    fn test_difficulty_wire_format() {
        let parsed: ReviewDifficulty = serde_json::from_str("\"easy\"").unwrap();
        assert_eq!(parsed, ReviewDifficulty::Easy);
        assert!(serde_json::from_str::<ReviewDifficulty>("\"Easy\"").is_err());
        assert!(serde_json::from_str::<ReviewDifficulty>("\"trivial\"").is_err());
    }
}
