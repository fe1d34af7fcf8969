// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plausibility checks for client-supplied event timestamps.
//!
//! Two windows apply, both relative to server time:
//! - the backfill ceiling: nothing older than `backfill_window` (24h);
//! - the clock-skew tolerance: the timestamp must lie within
//!   `clock_skew_tolerance` (5 min) of server time, in either direction.
//!
//! The backfill check runs first so an old timestamp is reported as a
//! backfill rejection rather than as generic skew.

use chrono::{DateTime, Utc};

use crate::services::streak::StreakPolicy;

/// Why a client timestamp was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimestampRejection {
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Cannot backfill events older than 24h")]
    BackfillTooOld,
}

impl TimestampRejection {
    /// Machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            TimestampRejection::InvalidTimestamp => "invalid_timestamp",
            TimestampRejection::BackfillTooOld => "backfill_too_old",
        }
    }
}

/// Decide the effective timestamp for a new event.
///
/// Without a client timestamp the server time is used.
pub fn validate(
    client: Option<DateTime<Utc>>,
    server_now: DateTime<Utc>,
    policy: &StreakPolicy,
) -> Result<DateTime<Utc>, TimestampRejection> {
    let Some(client) = client else {
        return Ok(server_now);
    };

    let age = server_now.signed_duration_since(client);

    if age > policy.backfill_window {
        return Err(TimestampRejection::BackfillTooOld);
    }

    if age.abs() > policy.clock_skew_tolerance {
        return Err(TimestampRejection::InvalidTimestamp);
    }

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn server_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_client_timestamp_uses_server_time() {
        let policy = StreakPolicy::default();
        assert_eq!(validate(None, server_now(), &policy), Ok(server_now()));
    }

    #[test]
    fn test_small_skew_accepted() {
        let policy = StreakPolicy::default();
        let behind = server_now() - Duration::minutes(4);
        let ahead = server_now() + Duration::minutes(5);

        assert_eq!(validate(Some(behind), server_now(), &policy), Ok(behind));
        assert_eq!(validate(Some(ahead), server_now(), &policy), Ok(ahead));
    }

    #[test]
    fn test_future_beyond_tolerance_rejected() {
        let policy = StreakPolicy::default();
        let ahead = server_now() + Duration::minutes(5) + Duration::seconds(1);

        assert_eq!(
            validate(Some(ahead), server_now(), &policy),
            Err(TimestampRejection::InvalidTimestamp)
        );
    }

    #[test]
    fn test_past_beyond_tolerance_rejected() {
        let policy = StreakPolicy::default();
        let behind = server_now() - Duration::hours(2);

        assert_eq!(
            validate(Some(behind), server_now(), &policy),
            Err(TimestampRejection::InvalidTimestamp)
        );
    }

    #[test]
    fn test_backfill_older_than_a_day_rejected() {
        let policy = StreakPolicy::default();
        let old = server_now() - Duration::hours(25);

        assert_eq!(
            validate(Some(old), server_now(), &policy),
            Err(TimestampRejection::BackfillTooOld)
        );
    }

    #[test]
    fn test_rejection_codes() {
        assert_eq!(TimestampRejection::InvalidTimestamp.code(), "invalid_timestamp");
        assert_eq!(TimestampRejection::BackfillTooOld.code(), "backfill_too_old");
        assert_eq!(
            TimestampRejection::BackfillTooOld.to_string(),
            "Cannot backfill events older than 24h"
        );
    }
}
