//! Per-user learning progress types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A learner, identified by the transport's channel identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub last_interaction_time: DateTime<Utc>,
}

/// Learning state of one card for one user (a learning-matrix row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningEntry {
    pub user_id: String,
    pub card_id: i64,
    /// Topic name, copied from the deck at enrollment.
    pub deck_title: String,
    pub last_shown: DateTime<Utc>,
    /// The card is eligible once `show_after <= now`.
    pub show_after: DateTime<Utc>,
    pub show_count: u32,
    pub easy_count: u32,
    pub hard_count: u32,
    /// Enrollment time.
    pub created_at: DateTime<Utc>,
}

impl LearningEntry {
    /// A freshly enrolled row: immediately eligible, counters at zero.
    pub fn enrolled(
        user_id: impl Into<String>,
        card_id: i64,
        deck_title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            card_id,
            deck_title: deck_title.into(),
            last_shown: DateTime::<Utc>::UNIX_EPOCH,
            show_after: DateTime::<Utc>::UNIX_EPOCH,
            show_count: 0,
            easy_count: 0,
            hard_count: 0,
            created_at: now,
        }
    }

    /// Whether the card may be shown at `now`.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.show_after <= now
    }
}

/// Marks a question as already asked for a card to a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShownQuestion {
    pub user_id: String,
    pub card_id: i64,
    pub question_id: i64,
}

/// Self-reported recall difficulty after seeing a card's back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Outcome {
    Easy,
    Hard,
}

/// Progress summary for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStats {
    pub deck_title: String,
    pub card_count: u32,
    /// Creation time of the oldest progress row of the topic.
    pub started_at: DateTime<Utc>,
    /// Percent of cards graded easy at least once, rounded down.
    pub learned_percent: u32,
}

/// Progress summary for a user across all topics in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,
    pub topics: Vec<TopicStats>,
}

impl UserStats {
    /// Render as a chat message.
    pub fn to_text(&self) -> String {
        if self.topics.is_empty() {
            return "You have no topics in progress.".to_string();
        }
        let mut lines = vec!["Your progress:".to_string()];
        for topic in &self.topics {
            lines.push(format!(
                "- {}: {} cards, started {}, {}% learned",
                topic.deck_title,
                topic.card_count,
                topic.started_at.format("%Y-%m-%d"),
                topic.learned_percent
            ));
        }
        lines.join("\n")
    }
}
