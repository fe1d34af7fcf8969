//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_FREEZE_TOKENS;
use crate::services::streak::StreakSummary;

fn default_freeze_tokens() -> u32 {
    DEFAULT_FREEZE_TOKENS
}

/// User profile stored in Firestore, including the streak summary fields.
///
/// The streak fields are a cache of the last recomputation; the event log
/// stays authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID (UUID, also used as document ID)
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address (lowercased, unique)
    pub email: String,
    /// PBKDF2 password hash
    pub password_hash: String,
    /// IANA timezone identifier
    #[serde(default)]
    pub timezone: Option<String>,
    /// When the timezone was locked; set once, never cleared
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub tz_locked_at: Option<DateTime<Utc>>,
    /// Consecutive active local days ending today or yesterday
    #[serde(default)]
    pub current_streak: u32,
    /// Historical maximum of `current_streak`
    #[serde(default)]
    pub longest_streak: u32,
    /// Local date (`YYYY-MM-DD`) of the latest qualifying activity
    #[serde(default)]
    pub last_active_date: Option<String>,
    /// Unused freeze tokens
    #[serde(default = "default_freeze_tokens")]
    pub freeze_tokens: u32,
    /// When the account was created
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_timezone_locked(&self) -> bool {
        self.tz_locked_at.is_some()
    }

    /// Store a freshly computed streak summary.
    ///
    /// `longest_streak` only ever grows, even if the summary was computed
    /// from a stale read.
    pub fn apply_streak_summary(&mut self, summary: StreakSummary, active_date: Option<&str>) {
        self.longest_streak = self
            .longest_streak
            .max(summary.longest_streak)
            .max(summary.current_streak);
        self.current_streak = summary.current_streak;

        if let Some(date) = active_date {
            // YYYY-MM-DD compares correctly as a string.
            let newer = self
                .last_active_date
                .as_deref()
                .map_or(true, |existing| date > existing);
            if newer {
                self.last_active_date = Some(date.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user() -> User {
        User {
            id: "user-1".to_string(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            password_hash: String::new(),
            timezone: Some("UTC".to_string()),
            tz_locked_at: None,
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
            freeze_tokens: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_longest_streak_never_decreases() {
        let mut user = make_user();
        user.apply_streak_summary(
            StreakSummary {
                current_streak: 5,
                longest_streak: 5,
            },
            None,
        );
        user.apply_streak_summary(
            StreakSummary {
                current_streak: 0,
                longest_streak: 3,
            },
            None,
        );

        assert_eq!(user.current_streak, 0);
        assert_eq!(user.longest_streak, 5);
    }

    #[test]
    fn test_last_active_date_only_moves_forward() {
        let mut user = make_user();
        let summary = StreakSummary {
            current_streak: 1,
            longest_streak: 1,
        };

        user.apply_streak_summary(summary, Some("2024-03-10"));
        user.apply_streak_summary(summary, Some("2024-03-09"));
        assert_eq!(user.last_active_date.as_deref(), Some("2024-03-10"));

        user.apply_streak_summary(summary, Some("2024-03-11"));
        assert_eq!(user.last_active_date.as_deref(), Some("2024-03-11"));
    }
}
