// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing with PBKDF2-HMAC-SHA256.
//!
//! Stored format: `pbkdf2_sha256$<iterations>$<salt b64>$<hash b64>`.
//! The iteration count travels with the hash, so raising the default only
//! affects newly set passwords.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use std::num::NonZeroU32;

const SCHEME: &str = "pbkdf2_sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;
static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Iteration count must be non-zero")]
    ZeroIterations,

    #[error("Random number generation failed")]
    Rng,

    #[error("Malformed password hash")]
    Malformed,
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> Result<String, PasswordError> {
    let iterations = NonZeroU32::new(iterations).ok_or(PasswordError::ZeroIterations)?;

    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| PasswordError::Rng)?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(ALGORITHM, iterations, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Check `password` against a stored hash. Comparison is constant-time.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(PasswordError::Malformed);
    };

    let iterations = iterations
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(PasswordError::Malformed)?;
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| PasswordError::Malformed)?;
    let hash = STANDARD_NO_PAD
        .decode(hash)
        .map_err(|_| PasswordError::Malformed)?;

    Ok(pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok())
}
