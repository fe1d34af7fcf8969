// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication tests.
//!
//! These tests verify that JWT tokens created by the auth routes decode
//! with the claims layout the middleware expects.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use study_tracker::error::AppError;
use study_tracker::middleware::auth::{create_jwt, verify_jwt, SESSION_DAYS};

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

/// Claims layout independent of the crate's own struct, so a change on
/// either side shows up here.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

#[test]
fn test_jwt_roundtrip() {
    let user_id = "5f0c6a52-5d2b-4f0e-9a57-0c1d2e3f4a5b";
    let token = create_jwt(user_id, SIGNING_KEY).unwrap();

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(SIGNING_KEY),
        &Validation::new(Algorithm::HS256),
    )
    .expect("Failed to decode JWT - check Claims struct compatibility");

    assert_eq!(token_data.claims.sub, user_id);
    assert!(token_data.claims.exp > token_data.claims.iat);

    assert_eq!(verify_jwt(&token, SIGNING_KEY).unwrap(), user_id);
}

#[test]
fn test_jwt_expires_after_session_lifetime() {
    let token = create_jwt("user-1", SIGNING_KEY).unwrap();

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    let claims = decode::<Claims>(&token, &DecodingKey::from_secret(SIGNING_KEY), &validation)
        .unwrap()
        .claims;

    let lifetime = (SESSION_DAYS * 86400) as usize;
    let now = unix_now();
    assert!(claims.exp > now + lifetime - 60);
    assert!(claims.exp <= now + lifetime + 60);
}

#[test]
fn test_wrong_key_rejected() {
    let token = create_jwt("user-1", SIGNING_KEY).unwrap();

    assert!(matches!(
        verify_jwt(&token, b"another_key_that_is_32_bytes!!!!"),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_expired_token_rejected() {
    let now = unix_now();
    let claims = Claims {
        sub: "user-1".to_string(),
        exp: now - 3600,
        iat: now - 86400,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(matches!(
        verify_jwt(&token, SIGNING_KEY),
        Err(AppError::InvalidToken)
    ));
}
