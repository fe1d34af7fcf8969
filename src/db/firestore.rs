// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and streak summary)
//! - Streak events (append-only activity log)
//! - Notes (content and review schedule)
//! - Revisions (planned revision sessions)
//!
//! Read-modify-write operations read the document through a handle bound to
//! the transaction, so a concurrent write to the same document makes the
//! commit fail. Failed commits are retried from a fresh read.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::db::collections;
use crate::error::AppError;
use crate::models::{ActivityEvent, Note, Revision, User};

/// Attempts at a read-modify-write transaction before giving up.
const TRANSACTION_ATTEMPTS: u32 = 5;
const TRANSACTION_RETRY_BACKOFF_MS: u64 = 25;

/// Claims an email address for one user. Document ID is derived from the
/// email, so two registrations for the same address contend on one document.
#[derive(Debug, Serialize, Deserialize)]
struct EmailReservation {
    user_id: String,
}

fn email_document_id(email: &str) -> String {
    URL_SAFE_NO_PAD.encode(email.as_bytes())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── Transactions ────────────────────────────────────────────

    /// A client whose reads join `transaction`.
    fn transaction_client(
        &self,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        self.client
            .clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
    }

    /// Sleep before the next attempt, or return the final error.
    async fn backoff_or_fail(
        attempt: u32,
        context: &str,
        error: impl std::fmt::Display,
    ) -> Result<(), AppError> {
        if attempt >= TRANSACTION_ATTEMPTS {
            return Err(AppError::Database(format!("{}: {}", context, error)));
        }

        tracing::warn!(attempt, error = %error, "{}, retrying", context);
        tokio::time::sleep(Duration::from_millis(
            TRANSACTION_RETRY_BACKOFF_MS * u64::from(attempt),
        ))
        .await;
        Ok(())
    }

    /// Transactionally read one document, let `f` modify it, and write it back.
    ///
    /// `f` returning `Ok(None)` (or the document being absent) ends the
    /// transaction without writing. `f` may run more than once when the
    /// commit loses a race, each time against a fresh read.
    async fn read_modify_write<T, F, R>(
        &self,
        collection: &str,
        doc_id: &str,
        mut f: F,
    ) -> Result<Option<R>, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnMut(&mut T) -> Result<Option<R>, AppError> + Send,
        R: Send,
    {
        let mut attempt = 1;
        loop {
            let mut transaction = self.client.begin_transaction().await.map_err(|e| {
                AppError::Database(format!("Failed to begin transaction: {}", e))
            })?;

            let read = self
                .transaction_client(&transaction)
                .fluent()
                .select()
                .by_id_in(collection)
                .obj::<T>()
                .one(doc_id)
                .await;

            let mut doc = match read {
                Ok(Some(doc)) => doc,
                Ok(None) => {
                    let _ = transaction.rollback().await;
                    return Ok(None);
                }
                Err(e) => {
                    let _ = transaction.rollback().await;
                    Self::backoff_or_fail(attempt, "Transactional read failed", e).await?;
                    attempt += 1;
                    continue;
                }
            };

            let result = match f(&mut doc) {
                Ok(Some(result)) => result,
                Ok(None) => {
                    let _ = transaction.rollback().await;
                    return Ok(None);
                }
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            self.client
                .fluent()
                .update()
                .in_col(collection)
                .document_id(doc_id)
                .object(&doc)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add write to transaction: {}", e))
                })?;

            match transaction.commit().await {
                Ok(_) => return Ok(Some(result)),
                Err(e) => {
                    Self::backoff_or_fail(attempt, "Transaction commit failed", e).await?;
                    attempt += 1;
                }
            }
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by (lowercased) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Store a new user, refusing duplicate emails.
    ///
    /// The email reservation and the user document are written in one
    /// transaction that first reads the reservation, so concurrent
    /// registrations for one address cannot both commit.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let reservation_id = email_document_id(&user.email);
        let reservation = EmailReservation {
            user_id: user.id.clone(),
        };

        let mut attempt = 1;
        loop {
            let mut transaction = self.client.begin_transaction().await.map_err(|e| {
                AppError::Database(format!("Failed to begin transaction: {}", e))
            })?;

            let existing = self
                .transaction_client(&transaction)
                .fluent()
                .select()
                .by_id_in(collections::USER_EMAILS)
                .obj::<EmailReservation>()
                .one(&reservation_id)
                .await;

            match existing {
                Ok(Some(_)) => {
                    let _ = transaction.rollback().await;
                    return Err(AppError::Conflict("Email already registered".to_string()));
                }
                Ok(None) => {}
                Err(e) => {
                    let _ = transaction.rollback().await;
                    Self::backoff_or_fail(attempt, "Email reservation read failed", e).await?;
                    attempt += 1;
                    continue;
                }
            }

            self.client
                .fluent()
                .update()
                .in_col(collections::USER_EMAILS)
                .document_id(&reservation_id)
                .object(&reservation)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add reservation to transaction: {}", e))
                })?;

            self.client
                .fluent()
                .update()
                .in_col(collections::USERS)
                .document_id(&user.id)
                .object(user)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add user to transaction: {}", e))
                })?;

            match transaction.commit().await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    Self::backoff_or_fail(attempt, "User registration commit failed", e).await?;
                    attempt += 1;
                }
            }
        }
    }

    /// Read-modify-write a user inside a transaction.
    pub async fn update_user<F, R>(&self, user_id: &str, mut f: F) -> Result<Option<R>, AppError>
    where
        F: FnMut(&mut User) -> Result<R, AppError> + Send,
        R: Send,
    {
        self.read_modify_write(collections::USERS, user_id, |user: &mut User| {
            f(user).map(Some)
        })
        .await
    }

    // ─── Streak Event Operations ─────────────────────────────────

    /// Append an activity event.
    pub async fn append_event(&self, event: &ActivityEvent) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::STREAK_EVENTS)
            .document_id(&event.id)
            .object(event)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a user's most recent events, newest first.
    pub async fn recent_events(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ActivityEvent>, AppError> {
        let user_id = user_id.to_string();
        let limit = u32::try_from(limit).unwrap_or(u32::MAX);

        self.client
            .fluent()
            .select()
            .from(collections::STREAK_EVENTS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([(
                "occurred_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Note Operations ─────────────────────────────────────────

    /// Create or replace a note.
    pub async fn set_note(&self, note: &Note) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::NOTES)
            .document_id(&note.id)
            .object(note)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a note, only if it belongs to `user_id`.
    pub async fn get_note(&self, user_id: &str, note_id: &str) -> Result<Option<Note>, AppError> {
        let note: Option<Note> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::NOTES)
            .obj()
            .one(note_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(note.filter(|n| n.user_id == user_id))
    }

    /// Get all notes for a user, most recently updated first.
    pub async fn list_notes(&self, user_id: &str) -> Result<Vec<Note>, AppError> {
        let user_id = user_id.to_string();

        self.client
            .fluent()
            .select()
            .from(collections::NOTES)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("updated_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read-modify-write a note owned by `user_id` inside a transaction.
    pub async fn update_note<F, R>(
        &self,
        user_id: &str,
        note_id: &str,
        mut f: F,
    ) -> Result<Option<R>, AppError>
    where
        F: FnMut(&mut Note) -> Result<R, AppError> + Send,
        R: Send,
    {
        self.read_modify_write(collections::NOTES, note_id, |note: &mut Note| {
            if note.user_id != user_id {
                return Ok(None);
            }
            f(note).map(Some)
        })
        .await
    }

    /// Delete a note owned by `user_id`.
    pub async fn delete_note(&self, user_id: &str, note_id: &str) -> Result<bool, AppError> {
        if self.get_note(user_id, note_id).await?.is_none() {
            return Ok(false);
        }

        self.client
            .fluent()
            .delete()
            .from(collections::NOTES)
            .document_id(note_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(user_id, note_id, "Deleted note");
        Ok(true)
    }

    // ─── Revision Operations ─────────────────────────────────────

    pub async fn set_revision(&self, revision: &Revision) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::REVISIONS)
            .document_id(&revision.id)
            .object(revision)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All of a user's revisions, earliest scheduled first.
    pub async fn list_revisions(&self, user_id: &str) -> Result<Vec<Revision>, AppError> {
        let user_id = user_id.to_string();

        self.client
            .fluent()
            .select()
            .from(collections::REVISIONS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([(
                "scheduled_for",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read-modify-write a revision owned by `user_id` inside a transaction.
    pub async fn update_revision<F, R>(
        &self,
        user_id: &str,
        revision_id: &str,
        mut f: F,
    ) -> Result<Option<R>, AppError>
    where
        F: FnMut(&mut Revision) -> Result<R, AppError> + Send,
        R: Send,
    {
        self.read_modify_write(collections::REVISIONS, revision_id, |revision: &mut Revision| {
            if revision.user_id != user_id {
                return Ok(None);
            }
            f(revision).map(Some)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_document_id_is_path_safe() {
        let id = email_document_id("a/b@example.com");
        assert!(!id.contains('/'));
        assert_ne!(id, email_document_id("a/c@example.com"));
    }
}
