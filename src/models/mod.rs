// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod event;
pub mod note;
pub mod revision;
pub mod user;

pub use event::{ActivityEvent, EventMetadata, EventType};
pub use note::Note;
pub use revision::{Revision, RevisionStatus};
pub use user::User;
