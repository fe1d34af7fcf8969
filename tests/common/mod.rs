// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use study_tracker::config::Config;
use study_tracker::db::{FirestoreDb, StudyDb};
use study_tracker::middleware::auth::create_jwt;
use study_tracker::models::User;
use study_tracker::routes::create_router;
use study_tracker::time_utils::FixedClock;
use study_tracker::AppState;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Default instant tests start at: 2024-03-10 12:00 UTC.
#[allow(dead_code)]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

/// A router over fresh in-memory storage with a controllable clock.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<FixedClock>,
}

#[allow(dead_code)]
impl TestApp {
    /// Send a request with an optional bearer token and JSON body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Store a user directly and return a session token for it.
    pub async fn seed_user(&self, timezone: Option<&str>, freeze_tokens: u32) -> (User, String) {
        let id = uuid::Uuid::new_v4().to_string();
        let user = User {
            id: id.clone(),
            name: "Test Student".to_string(),
            email: format!("{}@example.com", id),
            password_hash: String::new(),
            timezone: timezone.map(str::to_string),
            tz_locked_at: timezone.map(|_| self.clock_now()),
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
            freeze_tokens,
            created_at: self.clock_now(),
        };

        self.state.db.insert_user(&user).await.unwrap();
        let token = create_test_jwt(&user.id, &self.state.config.jwt_signing_key);
        (user, token)
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use study_tracker::time_utils::Clock;
        self.clock.now()
    }
}

/// Create a test app on in-memory storage, starting at [`test_now`].
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let clock = Arc::new(FixedClock::new(test_now()));
    let state = Arc::new(AppState::new(config, StudyDb::in_memory(), clock.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        clock,
    }
}

/// Create a session token the way the auth routes do.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_jwt(user_id, signing_key).expect("Failed to create JWT")
}
