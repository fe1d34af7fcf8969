// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process storage backend.
//!
//! Each record lives in a `DashMap` entry; holding the entry's shard lock for
//! the duration of an update closure gives the same per-record atomicity the
//! Firestore backend gets from transactions.

use dashmap::{mapref::entry::Entry, DashMap};

use crate::error::AppError;
use crate::models::{ActivityEvent, Note, Revision, User};

/// Process-local store for users, notes, revisions and the event log.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// Email to user ID; the entry lock serializes registrations per address
    emails: DashMap<String, String>,
    notes: DashMap<String, Note>,
    revisions: DashMap<String, Revision>,
    /// Events per user, in append order
    events: DashMap<String, Vec<ActivityEvent>>,
}

impl MemoryStore {
    // ─── Users ───────────────────────────────────────────────────

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|u| u.value().clone())
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let user_id = self.emails.get(email)?.value().clone();
        self.get_user(&user_id)
    }

    pub fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict("Email already registered".to_string())),
            Entry::Vacant(slot) => {
                // User goes in before the slot is released so lookups never
                // see the email without its user.
                self.users.insert(user.id.clone(), user.clone());
                slot.insert(user.id.clone());
                Ok(())
            }
        }
    }

    pub fn update_user<F, R>(&self, user_id: &str, f: F) -> Result<Option<R>, AppError>
    where
        F: FnOnce(&mut User) -> Result<R, AppError>,
    {
        let Some(mut entry) = self.users.get_mut(user_id) else {
            return Ok(None);
        };

        // Work on a copy so a failing closure leaves the record untouched.
        let mut user = entry.value().clone();
        let result = f(&mut user)?;
        *entry.value_mut() = user;
        Ok(Some(result))
    }

    // ─── Events ──────────────────────────────────────────────────

    pub fn append_event(&self, event: &ActivityEvent) {
        self.events
            .entry(event.user_id.clone())
            .or_default()
            .push(event.clone());
    }

    pub fn recent_events(&self, user_id: &str, limit: usize) -> Vec<ActivityEvent> {
        let mut events = self
            .events
            .get(user_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();

        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        events.truncate(limit);
        events
    }

    // ─── Notes ───────────────────────────────────────────────────

    pub fn insert_note(&self, note: &Note) {
        self.notes.insert(note.id.clone(), note.clone());
    }

    pub fn get_note(&self, user_id: &str, note_id: &str) -> Option<Note> {
        self.notes
            .get(note_id)
            .filter(|n| n.value().user_id == user_id)
            .map(|n| n.value().clone())
    }

    pub fn list_notes(&self, user_id: &str) -> Vec<Note> {
        let mut notes: Vec<Note> = self
            .notes
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();

        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }

    pub fn update_note<F, R>(&self, user_id: &str, note_id: &str, f: F) -> Result<Option<R>, AppError>
    where
        F: FnOnce(&mut Note) -> Result<R, AppError>,
    {
        let Some(mut entry) = self.notes.get_mut(note_id) else {
            return Ok(None);
        };
        if entry.value().user_id != user_id {
            return Ok(None);
        }

        let mut note = entry.value().clone();
        let result = f(&mut note)?;
        *entry.value_mut() = note;
        Ok(Some(result))
    }

    pub fn delete_note(&self, user_id: &str, note_id: &str) -> bool {
        self.notes
            .remove_if(note_id, |_, note| note.user_id == user_id)
            .is_some()
    }

    // ─── Revisions ───────────────────────────────────────────────

    pub fn insert_revision(&self, revision: &Revision) {
        self.revisions.insert(revision.id.clone(), revision.clone());
    }

    pub fn list_revisions(&self, user_id: &str) -> Vec<Revision> {
        let mut revisions: Vec<Revision> = self
            .revisions
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();

        revisions.sort_by(|a, b| a.scheduled_for.cmp(&b.scheduled_for));
        revisions
    }

    pub fn update_revision<F, R>(
        &self,
        user_id: &str,
        revision_id: &str,
        f: F,
    ) -> Result<Option<R>, AppError>
    where
        F: FnOnce(&mut Revision) -> Result<R, AppError>,
    {
        let Some(mut entry) = self.revisions.get_mut(revision_id) else {
            return Ok(None);
        };
        if entry.value().user_id != user_id {
            return Ok(None);
        }

        let mut revision = entry.value().clone();
        let result = f(&mut revision)?;
        *entry.value_mut() = revision;
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventMetadata, EventType};
    use chrono::{Duration, TimeZone, Utc};

    fn make_user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            timezone: None,
            tz_locked_at: None,
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
            freeze_tokens: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = MemoryStore::default();
        store.insert_user(&make_user("a", "same@example.com")).unwrap();

        let err = store
            .insert_user(&make_user("b", "same@example.com"))
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_concurrent_registrations_admit_one() {
        let store = std::sync::Arc::new(MemoryStore::default());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.insert_user(&make_user(&format!("user-{}", i), "race@example.com"))
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();

        assert_eq!(admitted, 1, "duplicate email admitted due to race condition");
        assert_eq!(store.users.len(), 1);
        assert!(store.find_user_by_email("race@example.com").is_some());
    }

    #[test]
    fn test_failed_update_leaves_user_untouched() {
        let store = MemoryStore::default();
        store.insert_user(&make_user("a", "a@example.com")).unwrap();

        let result: Result<Option<()>, AppError> = store.update_user("a", |user| {
            user.freeze_tokens = 0;
            Err(AppError::NoFreezeTokens)
        });

        assert!(matches!(result, Err(AppError::NoFreezeTokens)));
        assert_eq!(store.get_user("a").unwrap().freeze_tokens, 1);
    }

    #[test]
    fn test_update_missing_user_returns_none() {
        let store = MemoryStore::default();
        let result = store.update_user("ghost", |_| Ok(())).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_recent_events_newest_first_and_limited() {
        let store = MemoryStore::default();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        for day in [2, 0, 1, 3] {
            store.append_event(&ActivityEvent::new(
                "a",
                EventType::AiSession,
                base + Duration::days(day),
                EventMetadata::default(),
            ));
        }

        let events = store.recent_events("a", 3);
        let days: Vec<i64> = events
            .iter()
            .map(|e| (e.occurred_at - base).num_days())
            .collect();
        assert_eq!(days, vec![3, 2, 1]);
        assert!(store.recent_events("nobody", 10).is_empty());
    }

    #[test]
    fn test_notes_are_owner_scoped() {
        let store = MemoryStore::default();
        let note = Note::new("owner", "Title", None, vec![], Utc::now());
        store.insert_note(&note);

        assert!(store.get_note("owner", &note.id).is_some());
        assert!(store.get_note("intruder", &note.id).is_none());
        assert!(store
            .update_note("intruder", &note.id, |n| {
                n.title = "pwned".to_string();
                Ok(())
            })
            .unwrap()
            .is_none());
        assert!(!store.delete_note("intruder", &note.id));
        assert!(store.delete_note("owner", &note.id));
        assert!(store.get_note("owner", &note.id).is_none());
    }

    #[test]
    fn test_revisions_sorted_and_owner_scoped() {
        use crate::models::RevisionStatus;

        let store = MemoryStore::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let later = Revision::new(
            "a",
            "n",
            now + Duration::days(2),
            RevisionStatus::Pending,
            None,
            now,
        );
        let sooner = Revision::new(
            "a",
            "n",
            now + Duration::days(1),
            RevisionStatus::Pending,
            None,
            now,
        );
        store.insert_revision(&later);
        store.insert_revision(&sooner);
        store.insert_revision(&Revision::new("b", "m", now, RevisionStatus::Pending, None, now));

        let ids: Vec<String> = store.list_revisions("a").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![sooner.id.clone(), later.id.clone()]);

        assert!(store
            .update_revision("b", &sooner.id, |r| {
                r.skip(now);
                Ok(())
            })
            .unwrap()
            .is_none());
        assert_eq!(store.list_revisions("a")[0].status, RevisionStatus::Pending);
    }
}
