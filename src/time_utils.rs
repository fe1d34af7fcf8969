// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.
//!
//! Nothing in here reads the wall clock on its own: callers pass the instant
//! they care about, and request handlers get "now" from the [`Clock`] held in
//! the application state.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use std::sync::RwLock;

/// Calendar date format used for local dates (`YYYY-MM-DD`).
pub const LOCAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a client-supplied RFC3339 timestamp.
pub fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an IANA timezone identifier (e.g. `America/New_York`).
pub fn parse_timezone(timezone: &str) -> Option<Tz> {
    timezone.trim().parse::<Tz>().ok()
}

/// Resolve a stored timezone, falling back to UTC.
///
/// The fallback is logged so misconfigured clients show up in the logs
/// instead of silently drifting to UTC days.
pub fn resolve_timezone(timezone: Option<&str>) -> Tz {
    match timezone {
        Some(raw) => parse_timezone(raw).unwrap_or_else(|| {
            tracing::warn!(
                timezone = raw,
                "Unrecognised timezone, falling back to UTC calendar date"
            );
            Tz::UTC
        }),
        None => {
            tracing::warn!("No timezone set, falling back to UTC calendar date");
            Tz::UTC
        }
    }
}

/// Calendar date of `instant` as observed in `timezone`.
///
/// A missing or unrecognised timezone falls back to the UTC calendar date.
pub fn local_date(timezone: Option<&str>, instant: DateTime<Utc>) -> NaiveDate {
    instant
        .with_timezone(&resolve_timezone(timezone))
        .date_naive()
}

/// [`local_date`] formatted as `YYYY-MM-DD`.
pub fn local_date_string(timezone: Option<&str>, instant: DateTime<Utc>) -> String {
    format_local_date(local_date(timezone, instant))
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_local_date(date: NaiveDate) -> String {
    date.format(LOCAL_DATE_FORMAT).to_string()
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
