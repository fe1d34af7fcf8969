// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study activity events (the streak event log).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Kind of study activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A note was written or edited
    Note,
    /// A flashcard review session
    Review,
    /// A quiz attempt
    Quiz,
    /// A session with the AI study tools
    AiSession,
    /// A scheduled revision was completed
    Revision,
    /// Synthesised by spending a freeze token
    Freeze,
    /// Stored type this build does not recognise; never qualifies
    #[serde(other)]
    Unknown,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Note => "note",
            EventType::Review => "review",
            EventType::Quiz => "quiz",
            EventType::AiSession => "ai_session",
            EventType::Revision => "revision",
            EventType::Freeze => "freeze",
            EventType::Unknown => "unknown",
        }
    }

    /// Whether clients may submit this type directly.
    pub fn is_client_loggable(&self) -> bool {
        !matches!(self, EventType::Freeze | EventType::Unknown)
    }
}

/// Optional per-type details used by the qualification thresholds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
    /// Characters changed in a note edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flashcards_reviewed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_questions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_scheduled: Option<bool>,
}

/// Stored activity event. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Event ID (UUID, also used as document ID)
    pub id: String,
    /// Owning user
    pub user_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// When the activity happened
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl ActivityEvent {
    /// Create a new event with a fresh ID.
    pub fn new(
        user_id: impl Into<String>,
        event_type: EventType,
        occurred_at: DateTime<Utc>,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            event_type,
            occurred_at,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        let parsed: EventType = serde_json::from_str("\"ai_session\"").unwrap();
        assert_eq!(parsed, EventType::AiSession);
        assert_eq!(parsed.as_str(), "ai_session");

        let unknown: EventType = serde_json::from_str("\"nap\"").unwrap();
        assert_eq!(unknown, EventType::Unknown);
        assert!(!unknown.is_client_loggable());
        assert!(!EventType::Freeze.is_client_loggable());
        assert!(EventType::Quiz.is_client_loggable());
    }

    #[test]
    fn test_metadata_uses_camel_case() {
        let metadata: EventMetadata = serde_json::from_value(serde_json::json!({
            "editLength": 42,
            "noteId": "abc"
        }))
        .unwrap();

        assert_eq!(metadata.edit_length, Some(42));
        assert_eq!(metadata.note_id.as_deref(), Some("abc"));
        assert_eq!(metadata.flashcards_reviewed, None);
    }

    #[test]
    fn test_new_events_get_distinct_ids() {
        let now = Utc::now();
        let a = ActivityEvent::new("u", EventType::Quiz, now, EventMetadata::default());
        let b = ActivityEvent::new("u", EventType::Quiz, now, EventMetadata::default());
        assert_ne!(a.id, b.id);
    }
}
