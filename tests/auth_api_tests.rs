// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login and session tests.
//!
//! These tests verify that:
//! 1. Registration creates a locked-timezone account and a usable token
//! 2. Login accepts only the right password
//! 3. Session cookies are set on login and removed on logout
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use study_tracker::config::DEFAULT_FREEZE_TOKENS;
use tower::ServiceExt;

mod common;

fn registration(email: &str) -> serde_json::Value {
    json!({
        "name": "Ada",
        "email": email,
        "password": "hunter22",
        "timezone": "Europe/London",
    })
}

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let app = common::create_test_app();

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(registration("  Ada@Example.com ")),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["timezone"], "Europe/London");
    assert_eq!(body["user"]["freezeTokens"], DEFAULT_FREEZE_TOKENS);
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.request("GET", "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["id"], body["user"]["id"]);

    // Timezone was locked at registration.
    let (status, _) = app
        .request(
            "POST",
            "/api/streak/timezone",
            Some(token),
            Some(json!({ "timezone": "Asia/Tokyo" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_defaults_timezone_to_utc() {
    let app = common::create_test_app();

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Bo", "email": "bo@example.com", "password": "secret99" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["timezone"], "UTC");
}

#[tokio::test]
async fn test_register_validation() {
    let app = common::create_test_app();

    for body in [
        json!({ "name": "", "email": "a@example.com", "password": "secret99" }),
        json!({ "name": "A", "email": "not-an-email", "password": "secret99" }),
        json!({ "name": "A", "email": "a@example.com", "password": "short" }),
        json!({ "name": "A", "email": "a@example.com", "password": "secret99", "timezone": "Moon/Base" }),
        json!({ "email": "a@example.com" }),
    ] {
        let (status, response) = app
            .request("POST", "/api/auth/register", None, Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["error"], "bad_request");
    }
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = common::create_test_app();

    let (status, _) = app
        .request("POST", "/api/auth/register", None, Some(registration("dup@example.com")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request("POST", "/api/auth/register", None, Some(registration("DUP@example.com")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_login() {
    let app = common::create_test_app();
    app.request("POST", "/api/auth/register", None, Some(registration("cy@example.com")))
        .await;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "CY@example.com", "password": "hunter22" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "cy@example.com");
    assert!(body["token"].as_str().is_some());

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "cy@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "hunter22" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_sets_session_cookie_usable_for_auth() {
    let app = common::create_test_app();
    app.request("POST", "/api/auth/register", None, Some(registration("di@example.com")))
        .await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "di@example.com", "password": "hunter22" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("study_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"));

    let session = cookie.split(';').next().unwrap().to_string();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, session)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_removes_cookie() {
    let app = common::create_test_app();
    let (_, token) = app.seed_user(Some("UTC"), 1).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("study_token="));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("Path=/"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = common::create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/streak")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_health_is_public() {
    let app = common::create_test_app();

    let (status, body) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
