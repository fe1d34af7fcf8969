// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Which activity events count toward the daily streak.
//!
//! The thresholds keep zero-effort actions (saving a note unchanged,
//! flipping one flashcard) from keeping a streak alive.

use crate::models::{ActivityEvent, EventType};

/// Minimum characters changed for a note edit to count.
pub const MIN_EDIT_LENGTH: u32 = 20;
/// Minimum flashcards in a review session.
pub const MIN_FLASHCARDS_REVIEWED: u32 = 10;
/// Minimum questions answered in a quiz.
pub const MIN_QUIZ_QUESTIONS: u32 = 1;

/// Whether `event` counts toward the streak.
pub fn qualifies(event: &ActivityEvent) -> bool {
    let metadata = &event.metadata;
    match event.event_type {
        EventType::Note => metadata.edit_length.is_some_and(|n| n >= MIN_EDIT_LENGTH),
        EventType::Review => metadata
            .flashcards_reviewed
            .is_some_and(|n| n >= MIN_FLASHCARDS_REVIEWED),
        EventType::Quiz => metadata
            .quiz_questions
            .is_some_and(|n| n >= MIN_QUIZ_QUESTIONS),
        EventType::AiSession | EventType::Revision | EventType::Freeze => true,
        EventType::Unknown => false,
    }
}
