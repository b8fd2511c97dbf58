//! Delivery policy: decides which of a recipient's queued notifications may
//! be pushed.
//!
//! Two gates, applied in order:
//! 1. Recipient gate. Master switch or push switch off: everything is skipped.
//! 2. Category gate. Each known category requires one preference flag;
//!    unmapped categories always pass.
//!
//! Skipped notifications are still marked dispatched by the processor so
//! they leave the queue instead of being reconsidered on every run.

use weighin_common::types::{Notification, NotificationCategory, NotificationPreference};

/// Per-category opt-in flags on [`NotificationPreference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceFlag {
    DailyReminders,
    NewMessages,
    ProgressUpdates,
    CompetitionUpdates,
    LeaderboardChanges,
}

impl PreferenceFlag {
    pub fn is_enabled(self, preference: &NotificationPreference) -> bool {
        match self {
            PreferenceFlag::DailyReminders => preference.daily_reminders,
            PreferenceFlag::NewMessages => preference.new_messages,
            PreferenceFlag::ProgressUpdates => preference.progress_updates,
            PreferenceFlag::CompetitionUpdates => preference.competition_updates,
            PreferenceFlag::LeaderboardChanges => preference.leaderboard_changes,
        }
    }
}

impl std::fmt::Display for PreferenceFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferenceFlag::DailyReminders => write!(f, "daily_reminders"),
            PreferenceFlag::NewMessages => write!(f, "new_messages"),
            PreferenceFlag::ProgressUpdates => write!(f, "progress_updates"),
            PreferenceFlag::CompetitionUpdates => write!(f, "competition_updates"),
            PreferenceFlag::LeaderboardChanges => write!(f, "leaderboard_changes"),
        }
    }
}

/// The category → flag table. `None` means the category is never filtered.
pub fn required_flag(category: &NotificationCategory) -> Option<PreferenceFlag> {
    match category {
        NotificationCategory::DailySummary | NotificationCategory::WeighInReminder => {
            Some(PreferenceFlag::DailyReminders)
        }
        NotificationCategory::NewMessage => Some(PreferenceFlag::NewMessages),
        NotificationCategory::Achievement | NotificationCategory::Milestone => {
            Some(PreferenceFlag::ProgressUpdates)
        }
        NotificationCategory::CompetitionJoined
        | NotificationCategory::CompetitionStarted
        | NotificationCategory::CompetitionEnding
        | NotificationCategory::CompetitionEnded => Some(PreferenceFlag::CompetitionUpdates),
        NotificationCategory::LeaderboardChange => Some(PreferenceFlag::LeaderboardChanges),
        NotificationCategory::Other(_) => None,
    }
}

/// Why a notification was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    RecipientDisabled,
    CategoryDisabled(PreferenceFlag),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::RecipientDisabled => write!(f, "recipient has push disabled"),
            SkipReason::CategoryDisabled(flag) => write!(f, "{} disabled", flag),
        }
    }
}

/// A recipient's batch split by the policy.
#[derive(Debug, Default)]
pub struct FilteredBatch {
    pub deliver: Vec<Notification>,
    pub skipped: Vec<(Notification, SkipReason)>,
}

/// Apply both gates to one recipient's notifications. Order is preserved.
pub fn apply(preference: &NotificationPreference, notifications: Vec<Notification>) -> FilteredBatch {
    let mut batch = FilteredBatch::default();

    if !preference.accepts_push() {
        batch.skipped = notifications
            .into_iter()
            .map(|n| (n, SkipReason::RecipientDisabled))
            .collect();
        return batch;
    }

    for notification in notifications {
        match required_flag(&notification.category()) {
            Some(flag) if !flag.is_enabled(preference) => batch
                .skipped
                .push((notification, SkipReason::CategoryDisabled(flag))),
            _ => batch.deliver.push(notification),
        }
    }

    batch
}
