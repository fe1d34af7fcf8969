//! Database layer.
//!
//! [`StudyDb`] is the handle the rest of the crate uses. It is backed either
//! by Firestore or by an in-process store (tests and local development).
//! Both backends give the same guarantee for `update_*` operations: the
//! closure runs against the current record and its result is written back as
//! one atomic read-modify-write of that record. Nothing spans records.
//! The closure is `FnMut` because the Firestore backend reruns it when a
//! concurrent writer makes the commit fail.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use std::sync::Arc;

use crate::error::AppError;
use crate::models::{ActivityEvent, Note, Revision, User};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const NOTES: &str = "notes";
    /// Append-only activity log used for streak recomputation
    pub const STREAK_EVENTS: &str = "streak_events";
    pub const REVISIONS: &str = "revisions";
    /// One document per registered email, keyed by the encoded address
    pub const USER_EMAILS: &str = "user_emails";
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreDb),
    Memory(Arc<MemoryStore>),
}

/// Storage handle shared through the application state.
#[derive(Clone)]
pub struct StudyDb {
    backend: Backend,
}

impl StudyDb {
    pub fn firestore(db: FirestoreDb) -> Self {
        Self {
            backend: Backend::Firestore(db),
        }
    }

    /// An empty in-process store.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user(user_id).await,
            Backend::Memory(store) => Ok(store.get_user(user_id)),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.find_user_by_email(email).await,
            Backend::Memory(store) => Ok(store.find_user_by_email(email)),
        }
    }

    /// Store a new user. Fails with `Conflict` if the email is taken.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.insert_user(user).await,
            Backend::Memory(store) => store.insert_user(user),
        }
    }

    /// Atomically modify a user. Returns `None` if the user does not exist.
    ///
    /// If `f` returns an error nothing is written and the error is returned.
    pub async fn update_user<F, R>(&self, user_id: &str, f: F) -> Result<Option<R>, AppError>
    where
        F: FnMut(&mut User) -> Result<R, AppError> + Send,
        R: Send,
    {
        match &self.backend {
            Backend::Firestore(db) => db.update_user(user_id, f).await,
            Backend::Memory(store) => store.update_user(user_id, f),
        }
    }

    // ─── Activity Event Operations ───────────────────────────────

    /// Append an event to the log.
    pub async fn append_event(&self, event: &ActivityEvent) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.append_event(event).await,
            Backend::Memory(store) => {
                store.append_event(event);
                Ok(())
            }
        }
    }

    /// Up to `limit` of the user's events, newest first.
    pub async fn recent_events(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ActivityEvent>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.recent_events(user_id, limit).await,
            Backend::Memory(store) => Ok(store.recent_events(user_id, limit)),
        }
    }

    // ─── Note Operations ─────────────────────────────────────────

    pub async fn insert_note(&self, note: &Note) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.set_note(note).await,
            Backend::Memory(store) => {
                store.insert_note(note);
                Ok(())
            }
        }
    }

    /// Get a note if it exists and belongs to `user_id`.
    pub async fn get_note(&self, user_id: &str, note_id: &str) -> Result<Option<Note>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_note(user_id, note_id).await,
            Backend::Memory(store) => Ok(store.get_note(user_id, note_id)),
        }
    }

    /// All of a user's notes, most recently updated first.
    pub async fn list_notes(&self, user_id: &str) -> Result<Vec<Note>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.list_notes(user_id).await,
            Backend::Memory(store) => Ok(store.list_notes(user_id)),
        }
    }

    /// Atomically modify a note owned by `user_id`.
    ///
    /// Returns `None` if the note does not exist or belongs to someone else.
    pub async fn update_note<F, R>(
        &self,
        user_id: &str,
        note_id: &str,
        f: F,
    ) -> Result<Option<R>, AppError>
    where
        F: FnMut(&mut Note) -> Result<R, AppError> + Send,
        R: Send,
    {
        match &self.backend {
            Backend::Firestore(db) => db.update_note(user_id, note_id, f).await,
            Backend::Memory(store) => store.update_note(user_id, note_id, f),
        }
    }

    /// Delete a note owned by `user_id`. Returns whether anything was deleted.
    pub async fn delete_note(&self, user_id: &str, note_id: &str) -> Result<bool, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.delete_note(user_id, note_id).await,
            Backend::Memory(store) => Ok(store.delete_note(user_id, note_id)),
        }
    }

    // ─── Revision Operations ─────────────────────────────────────

    pub async fn insert_revision(&self, revision: &Revision) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.set_revision(revision).await,
            Backend::Memory(store) => {
                store.insert_revision(revision);
                Ok(())
            }
        }
    }

    /// All of a user's revisions, earliest scheduled first.
    pub async fn list_revisions(&self, user_id: &str) -> Result<Vec<Revision>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.list_revisions(user_id).await,
            Backend::Memory(store) => Ok(store.list_revisions(user_id)),
        }
    }

    /// Atomically modify a revision owned by `user_id`.
    ///
    /// Returns `None` if the revision does not exist or belongs to someone else.
    pub async fn update_revision<F, R>(
        &self,
        user_id: &str,
        revision_id: &str,
        f: F,
    ) -> Result<Option<R>, AppError>
    where
        F: FnMut(&mut Revision) -> Result<R, AppError> + Send,
        R: Send,
    {
        match &self.backend {
            Backend::Firestore(db) => db.update_revision(user_id, revision_id, f).await,
            Backend::Memory(store) => store.update_revision(user_id, revision_id, f),
        }
    }
}
