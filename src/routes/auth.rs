// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidateEmail};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, removal_cookie, session_cookie, AuthUser};
use crate::models::User;
use crate::routes::ValidatedJson;
use crate::services::password;
use crate::time_utils::{format_utc_rfc3339, parse_timezone};
use crate::AppState;

const DEFAULT_TIMEZONE: &str = "UTC";

/// Routes that do not need a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Routes that require a session (auth middleware applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
}

/// Public view of a user.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub timezone: Option<String>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<String>,
    pub freeze_tokens: u32,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            timezone: user.timezone,
            current_streak: user.current_streak,
            longest_streak: user.longest_streak,
            last_active_date: user.last_active_date,
            freeze_tokens: user.freeze_tokens,
            created_at: format_utc_rfc3339(user.created_at),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: String,
}

// ─── Register ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(length(min = 3, max = 254))]
    email: String,
    #[validate(length(min = 6, max = 256))]
    password: String,
    #[serde(default)]
    timezone: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let email = normalize_email(&body.email);
    if !email.validate_email() {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name must not be blank".to_string()));
    }

    let timezone = match body.timezone.as_deref().map(str::trim) {
        Some(tz) if !tz.is_empty() => {
            if parse_timezone(tz).is_none() {
                return Err(AppError::BadRequest(format!("Unknown timezone: {}", tz)));
            }
            tz.to_string()
        }
        _ => DEFAULT_TIMEZONE.to_string(),
    };

    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(body.password, state.config.password_iterations).await?;
    let now = state.clock.now();

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        email,
        password_hash,
        timezone: Some(timezone),
        tz_locked_at: Some(now),
        current_streak: 0,
        longest_streak: 0,
        last_active_date: None,
        freeze_tokens: state.config.default_freeze_tokens,
        created_at: now,
    };

    state.db.insert_user(&user).await?;
    tracing::info!(user_id = %user.id, timezone = ?user.timezone, "User registered");

    let (jar, session) = start_session(&state, jar, user)?;
    Ok((StatusCode::CREATED, jar, Json(session)))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct LoginRequest {
    #[validate(length(min = 1))]
    email: String,
    #[validate(length(min = 1))]
    password: String,
    #[serde(default)]
    timezone: Option<String>,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let email = normalize_email(&body.email);

    let Some(mut user) = state.db.find_user_by_email(&email).await? else {
        tracing::info!("Login attempt for unknown email");
        return Err(AppError::Unauthorized);
    };

    let stored_hash = user.password_hash.clone();
    let password = body.password;
    let valid =
        tokio::task::spawn_blocking(move || password::verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Stored password hash unreadable");
                AppError::Internal(e.into())
            })?;

    if !valid {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(AppError::Unauthorized);
    }

    if !user.is_timezone_locked() {
        let timezone = login_timezone(body.timezone.as_deref());
        let now = state.clock.now();
        let locked = state
            .db
            .update_user(&user.id, move |stored| {
                if !stored.is_timezone_locked() {
                    stored.timezone = Some(timezone.clone());
                    stored.tz_locked_at = Some(now);
                }
                Ok(stored.clone())
            })
            .await?;

        if let Some(updated) = locked {
            tracing::info!(
                user_id = %updated.id,
                timezone = ?updated.timezone,
                "Timezone locked at login"
            );
            user = updated;
        }
    }

    tracing::info!(user_id = %user.id, "User logged in");
    let (jar, session) = start_session(&state, jar, user)?;
    Ok((jar, Json(session)))
}

/// Timezone to lock at first login. Unusable values fall back to UTC.
fn login_timezone(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(tz) if parse_timezone(tz).is_some() => tz.to_string(),
        Some(tz) if !tz.is_empty() => {
            tracing::warn!(timezone = tz, "Unknown timezone at login, using UTC");
            DEFAULT_TIMEZONE.to_string()
        }
        _ => DEFAULT_TIMEZONE.to_string(),
    }
}

// ─── Session ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub user: UserResponse,
}

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.user_id)))?;

    Ok(Json(MeResponse { user: user.into() }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Clear the session cookie. Bearer tokens simply expire.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(auth): Extension<AuthUser>,
) -> (CookieJar, Json<LogoutResponse>) {
    tracing::info!(user_id = %auth.user_id, "User logged out");

    let jar = jar.add(removal_cookie(&state.config.frontend_url));
    (
        jar,
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}

fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, SessionResponse)> {
    let token = create_jwt(&user.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let jar = jar.add(session_cookie(token.clone(), &state.config.frontend_url));
    Ok((
        jar,
        SessionResponse {
            user: user.into(),
            token,
        },
    ))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn hash_password(password: String, iterations: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password, iterations))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))
}
