use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Known notification categories.
///
/// Rows store the category as free text; anything unrecognised parses to
/// `Other` and is never filtered by preference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    DailySummary,
    WeighInReminder,
    NewMessage,
    Achievement,
    Milestone,
    CompetitionJoined,
    CompetitionStarted,
    CompetitionEnding,
    CompetitionEnded,
    LeaderboardChange,
    Other(String),
}

impl NotificationCategory {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "daily_summary" => NotificationCategory::DailySummary,
            "weigh_in_reminder" => NotificationCategory::WeighInReminder,
            "new_message" => NotificationCategory::NewMessage,
            "achievement" => NotificationCategory::Achievement,
            "milestone" => NotificationCategory::Milestone,
            "competition_joined" => NotificationCategory::CompetitionJoined,
            "competition_started" => NotificationCategory::CompetitionStarted,
            "competition_ending" => NotificationCategory::CompetitionEnding,
            "competition_ended" => NotificationCategory::CompetitionEnded,
            "leaderboard_change" => NotificationCategory::LeaderboardChange,
            other => NotificationCategory::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationCategory::DailySummary => write!(f, "daily_summary"),
            NotificationCategory::WeighInReminder => write!(f, "weigh_in_reminder"),
            NotificationCategory::NewMessage => write!(f, "new_message"),
            NotificationCategory::Achievement => write!(f, "achievement"),
            NotificationCategory::Milestone => write!(f, "milestone"),
            NotificationCategory::CompetitionJoined => write!(f, "competition_joined"),
            NotificationCategory::CompetitionStarted => write!(f, "competition_started"),
            NotificationCategory::CompetitionEnding => write!(f, "competition_ending"),
            NotificationCategory::CompetitionEnded => write!(f, "competition_ended"),
            NotificationCategory::LeaderboardChange => write!(f, "leaderboard_change"),
            NotificationCategory::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Digest cadence for a user's summary notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DigestFrequency {
    Never,
    Daily,
    Weekly,
}

impl std::fmt::Display for DigestFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestFrequency::Never => write!(f, "never"),
            DigestFrequency::Daily => write!(f, "daily"),
            DigestFrequency::Weekly => write!(f, "weekly"),
        }
    }
}

/// A notification row. `sent_at` is the dispatch timestamp: `None` while
/// queued, set once when sent or deliberately skipped.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub action_url: Option<String>,
    pub data: serde_json::Value,
    pub is_read: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn category(&self) -> NotificationCategory {
        NotificationCategory::parse(&self.notification_type)
    }

    pub fn is_queued(&self) -> bool {
        self.sent_at.is_none() && !self.is_read
    }
}

/// Parameters for enqueueing a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Per-user notification preferences. One row per user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationPreference {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Master switch
    pub enabled: bool,
    pub push_enabled: bool,
    pub in_app_enabled: bool,
    pub daily_reminders: bool,
    pub new_messages: bool,
    pub progress_updates: bool,
    pub competition_updates: bool,
    pub leaderboard_changes: bool,
    pub max_per_day: i32,
    pub digest_frequency: DigestFrequency,
    pub quiet_hours_start: Option<NaiveTime>,
    pub quiet_hours_end: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreference {
    /// Whether push delivery is allowed at all for this user.
    pub fn accepts_push(&self) -> bool {
        self.enabled && self.push_enabled
    }
}

/// Values used when a user's preference row is created lazily.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceDefaults {
    pub enabled: bool,
    pub push_enabled: bool,
    pub in_app_enabled: bool,
    pub daily_reminders: bool,
    pub new_messages: bool,
    pub progress_updates: bool,
    pub competition_updates: bool,
    pub leaderboard_changes: bool,
    pub max_per_day: i32,
    pub digest_frequency: DigestFrequency,
    pub quiet_hours_start: Option<NaiveTime>,
    pub quiet_hours_end: Option<NaiveTime>,
}

impl Default for PreferenceDefaults {
    fn default() -> Self {
        Self {
            enabled: true,
            push_enabled: true,
            in_app_enabled: true,
            daily_reminders: true,
            new_messages: true,
            progress_updates: true,
            competition_updates: true,
            // Leaderboard churn is noisy; opt-in only
            leaderboard_changes: false,
            max_per_day: 5,
            digest_frequency: DigestFrequency::Weekly,
            quiet_hours_start: None,
            quiet_hours_end: None,
        }
    }
}

impl PreferenceDefaults {
    /// Materialise a preference row for `user_id` from these defaults.
    pub fn to_preference(&self, user_id: Uuid) -> NotificationPreference {
        let now = Utc::now();
        NotificationPreference {
            id: Uuid::new_v4(),
            user_id,
            enabled: self.enabled,
            push_enabled: self.push_enabled,
            in_app_enabled: self.in_app_enabled,
            daily_reminders: self.daily_reminders,
            new_messages: self.new_messages,
            progress_updates: self.progress_updates,
            competition_updates: self.competition_updates,
            leaderboard_changes: self.leaderboard_changes,
            max_per_day: self.max_per_day,
            digest_frequency: self.digest_frequency,
            quiet_hours_start: self.quiet_hours_start,
            quiet_hours_end: self.quiet_hours_end,
            created_at: now,
            updated_at: now,
        }
    }
}
