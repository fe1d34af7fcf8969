// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily study streaks.
//!
//! The streak is never incremented in place. Every read and every write
//! recomputes it from the event log:
//! 1. Load the most recent events (bounded by the lookback window)
//! 2. Keep qualifying events and map them to local calendar dates
//! 3. Count consecutive active days ending today (or yesterday, as grace)
//! 4. Persist the summary on the user document for display
//!
//! A crash between appending an event and persisting the summary therefore
//! heals itself on the next recomputation.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::StudyDb;
use crate::error::{AppError, Result};
use crate::models::{ActivityEvent, EventMetadata, EventType, User};
use crate::services::{qualification, timestamp_guard};
use crate::time_utils::{self, Clock};

/// Events considered per recomputation.
pub const DEFAULT_LOOKBACK_EVENTS: usize = 365;

/// Attempts at decrementing a freeze token after its event was written.
const FREEZE_DECREMENT_ATTEMPTS: u32 = 3;
const FREEZE_RETRY_BACKOFF_MS: u64 = 50;

/// Tunables for recomputation and timestamp validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakPolicy {
    /// Maximum number of most-recent events read per recomputation
    pub lookback_events: usize,
    /// Allowed distance between client and server clocks
    pub clock_skew_tolerance: Duration,
    /// Oldest client timestamp accepted for a new event
    pub backfill_window: Duration,
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            lookback_events: DEFAULT_LOOKBACK_EVENTS,
            clock_skew_tolerance: Duration::minutes(5),
            backfill_window: Duration::hours(24),
        }
    }
}

/// Result of a streak recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Compute the streak for one user's events.
///
/// `events` may be in any order and may include non-qualifying events.
/// The result depends only on the arguments, so repeated calls with the same
/// log and `now` agree.
///
/// The backward walk always starts at the day before `today`, even when only
/// `yesterday` is active. A streak whose last active day is yesterday is
/// therefore counted one higher than its number of active days; this matches
/// the numbers users have already been shown.
pub fn compute_streak(
    events: &[ActivityEvent],
    timezone: Option<&str>,
    now: DateTime<Utc>,
    stored_longest: u32,
) -> StreakSummary {
    let tz = time_utils::resolve_timezone(timezone);
    let local = |instant: DateTime<Utc>| instant.with_timezone(&tz).date_naive();

    let active_dates: HashSet<_> = events
        .iter()
        .filter(|e| qualification::qualifies(e))
        .map(|e| local(e.occurred_at))
        .collect();

    let today = local(now);
    let yesterday = local(now - Duration::hours(24));

    let mut current_streak = 0;
    if active_dates.contains(&today) || active_dates.contains(&yesterday) {
        current_streak = 1;
        let mut check = today.pred_opt();
        while let Some(date) = check.filter(|d| active_dates.contains(d)) {
            current_streak += 1;
            check = date.pred_opt();
        }
    }

    StreakSummary {
        current_streak,
        longest_streak: stored_longest.max(current_streak),
    }
}

/// Snapshot returned by the streak query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakStatus {
    pub summary: StreakSummary,
    pub last_active_date: Option<String>,
    pub timezone: Option<String>,
    pub freeze_tokens: u32,
}

/// An accepted event together with the recomputed streak.
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub event: ActivityEvent,
    pub summary: StreakSummary,
}

/// Result of spending a freeze token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezeOutcome {
    pub remaining_tokens: u32,
    pub summary: StreakSummary,
}

/// Activity submission to be validated and logged.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    /// Client-claimed time of the activity; server time if absent
    pub occurred_at: Option<DateTime<Utc>>,
    pub metadata: EventMetadata,
}

/// Streak operations over the event log and user documents.
#[derive(Clone)]
pub struct StreakService {
    db: StudyDb,
    clock: Arc<dyn Clock>,
    policy: StreakPolicy,
}

impl StreakService {
    pub fn new(db: StudyDb, clock: Arc<dyn Clock>, policy: StreakPolicy) -> Self {
        Self { db, clock, policy }
    }

    /// Recompute a user's streak from the log without persisting it.
    ///
    /// An unknown user yields an empty summary; callers that need the user
    /// to exist check for it themselves.
    pub async fn recompute(&self, user_id: &str) -> Result<StreakSummary> {
        let Some(user) = self.db.get_user(user_id).await? else {
            return Ok(StreakSummary::default());
        };
        self.recompute_for(&user, self.clock.now()).await
    }

    async fn recompute_for(&self, user: &User, now: DateTime<Utc>) -> Result<StreakSummary> {
        let events = self
            .db
            .recent_events(&user.id, self.policy.lookback_events)
            .await?;

        Ok(compute_streak(
            &events,
            user.timezone.as_deref(),
            now,
            user.longest_streak,
        ))
    }

    /// Validate, store and count a study activity.
    pub async fn log_event(&self, user_id: &str, new_event: NewEvent) -> Result<LoggedEvent> {
        let now = self.clock.now();
        let user = self.require_user(user_id).await?;

        let occurred_at = timestamp_guard::validate(new_event.occurred_at, now, &self.policy)
            .inspect_err(|rejection| {
                tracing::info!(
                    user_id,
                    reason = rejection.code(),
                    claimed = ?new_event.occurred_at,
                    "Rejected event timestamp"
                );
            })?;

        let event = ActivityEvent::new(
            user_id,
            new_event.event_type,
            occurred_at,
            new_event.metadata,
        );
        self.db.append_event(&event).await?;

        let qualifies = qualification::qualifies(&event);
        tracing::info!(
            user_id,
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            qualifies,
            "Logged activity event"
        );

        let active_date = qualifies
            .then(|| time_utils::local_date_string(user.timezone.as_deref(), occurred_at));
        let summary = self.refresh_summary(&user, now, active_date).await?;

        Ok(LoggedEvent { event, summary })
    }

    /// Current streak state, freshly recomputed.
    ///
    /// The recomputed summary is written back so a later read never reports
    /// a smaller longest streak than this one did.
    pub async fn get_streak(&self, user_id: &str) -> Result<StreakStatus> {
        let user = self.require_user(user_id).await?;
        let summary = self.refresh_summary(&user, self.clock.now(), None).await?;

        Ok(StreakStatus {
            summary,
            last_active_date: user.last_active_date,
            timezone: user.timezone,
            freeze_tokens: user.freeze_tokens,
        })
    }

    /// Spend a freeze token to mark today as active.
    ///
    /// The freeze event is written before the token is decremented, so a
    /// failure in between still leaves the day covered for recomputation.
    pub async fn use_freeze_token(&self, user_id: &str) -> Result<FreezeOutcome> {
        let now = self.clock.now();
        let user = self.require_user(user_id).await?;

        if user.freeze_tokens == 0 {
            return Err(AppError::NoFreezeTokens);
        }

        let event = ActivityEvent::new(user_id, EventType::Freeze, now, EventMetadata::default());
        self.db.append_event(&event).await?;

        let remaining_tokens = self.decrement_freeze_token(user_id).await?;

        let active_date = time_utils::local_date_string(user.timezone.as_deref(), now);
        let summary = self.refresh_summary(&user, now, Some(active_date)).await?;

        tracing::info!(
            user_id,
            remaining_tokens,
            current_streak = summary.current_streak,
            "Freeze token used"
        );

        Ok(FreezeOutcome {
            remaining_tokens,
            summary,
        })
    }

    /// Set and lock the user's timezone. Only allowed once.
    ///
    /// A locked user gets `TimezoneLocked` whatever zone they send; the zone
    /// is only validated for users who may still set it.
    pub async fn set_timezone(&self, user_id: &str, timezone: &str) -> Result<String> {
        let now = self.clock.now();
        let tz = timezone.trim().to_string();
        self.db
            .update_user(user_id, move |user| {
                if user.is_timezone_locked() {
                    return Err(AppError::TimezoneLocked);
                }
                if time_utils::parse_timezone(&tz).is_none() {
                    return Err(AppError::BadRequest(format!("Unknown timezone: {}", tz)));
                }
                user.timezone = Some(tz.clone());
                user.tz_locked_at = Some(now);
                Ok(tz.clone())
            })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn require_user(&self, user_id: &str) -> Result<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Recompute and store the summary on the user document.
    async fn refresh_summary(
        &self,
        user: &User,
        now: DateTime<Utc>,
        active_date: Option<String>,
    ) -> Result<StreakSummary> {
        let summary = self.recompute_for(user, now).await?;

        self.db
            .update_user(&user.id, move |stored| {
                stored.apply_streak_summary(summary, active_date.as_deref());
                Ok(())
            })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;

        Ok(summary)
    }

    async fn decrement_freeze_token(&self, user_id: &str) -> Result<u32> {
        let mut attempt = 1;
        loop {
            let outcome = self
                .db
                .update_user(user_id, |user| {
                    if user.freeze_tokens == 0 {
                        return Err(AppError::NoFreezeTokens);
                    }
                    user.freeze_tokens -= 1;
                    Ok(user.freeze_tokens)
                })
                .await;

            match outcome {
                Ok(Some(remaining)) => return Ok(remaining),
                Ok(None) => {
                    return Err(AppError::NotFound(format!("User {} not found", user_id)))
                }
                Err(AppError::NoFreezeTokens) => {
                    // Another request spent the last token between our check and now.
                    tracing::warn!(
                        user_id,
                        "Freeze event written but token already spent concurrently"
                    );
                    return Err(AppError::NoFreezeTokens);
                }
                Err(e) if e.is_retryable() && attempt < FREEZE_DECREMENT_ATTEMPTS => {
                    tracing::warn!(user_id, attempt, error = %e, "Retrying freeze token decrement");
                    tokio::time::sleep(std::time::Duration::from_millis(
                        FREEZE_RETRY_BACKOFF_MS * u64::from(attempt),
                    ))
                    .await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        user_id,
                        attempt,
                        error = %e,
                        "Freeze token decrement failed after freeze event was written"
                    );
                    return Err(e);
                }
            }
        }
    }
}
