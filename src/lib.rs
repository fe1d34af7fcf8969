// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study-Tracker: study notes with daily streaks and spaced repetition
//!
//! This crate provides the backend API for logging study activity,
//! deriving daily streaks from the activity log, scheduling note reviews
//! and planning revision sessions.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::StudyDb;
use services::{ReviewScheduler, RevisionService, StreakService, TextGenerationService};
use std::sync::Arc;
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: StudyDb,
    pub clock: Arc<dyn Clock>,
    pub streak_service: StreakService,
    pub review_scheduler: ReviewScheduler,
    pub revisions: RevisionService,
    pub text_generation: TextGenerationService,
}

impl AppState {
    /// Wire up services over a storage backend and clock.
    pub fn new(config: Config, db: StudyDb, clock: Arc<dyn Clock>) -> Self {
        let streak_service =
            StreakService::new(db.clone(), clock.clone(), config.streak_policy.clone());
        let review_scheduler = ReviewScheduler::new(db.clone(), clock.clone());
        let revisions = RevisionService::new(db.clone(), clock.clone());
        let text_generation = TextGenerationService::new(
            config.huggingface_api_key.clone(),
            config.text_generation_url.clone(),
        );

        Self {
            config,
            db,
            clock,
            streak_service,
            review_scheduler,
            revisions,
            text_generation,
        }
    }
}
