//! Proactive review reminders.
//!
//! Walks the address book and builds one message per user who has cards
//! ready. Delivery is left to the transport.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conversation::ConversationStore;
use crate::error::RecallResult;
use crate::scheduling::Scheduler;
use crate::types::{ConversationAddress, OutboundMessage};

/// A message to deliver to a known conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub address: ConversationAddress,
    pub message: OutboundMessage,
}

pub struct ReminderSweep {
    conversations: Arc<dyn ConversationStore>,
    scheduler: Arc<Scheduler>,
}

impl ReminderSweep {
    pub fn new(conversations: Arc<dyn ConversationStore>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            conversations,
            scheduler,
        }
    }

    /// Reminders for every user with at least one due card.
    pub fn collect(&self, now: DateTime<Utc>) -> RecallResult<Vec<Reminder>> {
        let mut reminders = Vec::new();

        for address in self.conversations.list_addresses()? {
            let due = self.scheduler.due_count(&address.user_id, now)?;
            if due == 0 {
                continue;
            }
            debug!(user_id = %address.user_id, due, "User has cards to review");
            reminders.push(Reminder {
                message: OutboundMessage::text(reminder_text(due)),
                address,
            });
        }

        info!(count = reminders.len(), "Collected review reminders");
        Ok(reminders)
    }
}

fn reminder_text(due: usize) -> String {
    if due == 1 {
        "You have 1 card ready for review.".to_string()
    } else {
        format!("You have {} cards ready for review.", due)
    }
}
