// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod password;
pub mod qualification;
pub mod review;
pub mod revision;
pub mod streak;
pub mod text_generation;
pub mod timestamp_guard;

pub use review::{ReviewDifficulty, ReviewScheduler};
pub use revision::RevisionService;
pub use streak::{StreakPolicy, StreakService, StreakSummary};
pub use text_generation::TextGenerationService;
