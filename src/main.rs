// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study-Tracker API Server
//!
//! Serves study notes, activity streaks and review scheduling.

use study_tracker::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, StudyDb},
    time_utils::SystemClock,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Study-Tracker API");

    let db = match config.storage_backend {
        StorageBackend::Firestore => {
            StudyDb::firestore(FirestoreDb::new(&config.gcp_project_id).await?)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data will not survive a restart");
            StudyDb::in_memory()
        }
    };

    if config.huggingface_api_key.is_none() {
        tracing::info!("HUGGINGFACE_API_KEY not set, summaries will be generated locally");
    }

    tracing::info!(
        lookback_events = config.streak_policy.lookback_events,
        default_freeze_tokens = config.default_freeze_tokens,
        "Streak policy loaded"
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, Arc::new(SystemClock)));

    // Build router
    let app = study_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("study_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
