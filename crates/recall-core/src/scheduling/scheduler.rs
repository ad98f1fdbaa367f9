//! Spaced-repetition scheduling.
//!
//! A fixed interval table keyed by the consecutive-easy count decides when a
//! card becomes eligible again. Hard answers never push a card further out;
//! they only make it win ties against cards shown at the same time.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::catalog::CatalogStore;
use crate::error::RecallResult;
use crate::progress::ProgressStore;
use crate::types::{Card, Deck, LearningEntry, Outcome};

/// Days until a card is eligible again after its `easy_count`-th easy answer.
pub fn interval_days(easy_count: u32) -> i64 {
    match easy_count {
        1 => 1,
        2 => 6,
        3 => 9,
        4 => 19,
        _ => 19,
    }
}

/// Eligible rows in presentation order.
///
/// Least recently shown first; among equals, the one answered Hard most often.
/// Card id breaks any remaining tie so the order is deterministic.
pub fn due_in_order(entries: &[LearningEntry], now: DateTime<Utc>) -> Vec<&LearningEntry> {
    let mut due: Vec<&LearningEntry> = entries.iter().filter(|e| e.is_eligible(now)).collect();
    due.sort_by_key(|e| (e.last_shown, Reverse(e.hard_count), e.card_id));
    due
}

/// The row to present next, if any is eligible.
pub fn select_next_due(entries: &[LearningEntry], now: DateTime<Utc>) -> Option<&LearningEntry> {
    due_in_order(entries, now).into_iter().next()
}

/// Record that the card's front was presented.
pub fn apply_shown(entry: &mut LearningEntry, now: DateTime<Utc>) {
    entry.last_shown = now;
    entry.show_count += 1;
}

/// Record the learner's self-graded outcome.
pub fn apply_outcome(entry: &mut LearningEntry, outcome: Outcome, now: DateTime<Utc>) {
    match outcome {
        Outcome::Easy => {
            entry.easy_count += 1;
            entry.show_after = now + Duration::days(interval_days(entry.easy_count));
        }
        Outcome::Hard => {
            entry.hard_count += 1;
        }
    }
}

/// A due card together with its progress row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueCard {
    pub entry: LearningEntry,
    pub card: Card,
}

/// Store-backed scheduling operations.
pub struct Scheduler {
    progress: Arc<dyn ProgressStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl Scheduler {
    pub fn new(progress: Arc<dyn ProgressStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { progress, catalog }
    }

    /// The next card to present, or `None` when nothing is eligible.
    ///
    /// Rows whose card has disappeared from the catalog are skipped.
    pub fn next_due_card(&self, user_id: &str, now: DateTime<Utc>) -> RecallResult<Option<DueCard>> {
        let entries = self.progress.entries_for_user(user_id)?;

        for entry in due_in_order(&entries, now) {
            match self.catalog.get_card(entry.card_id)? {
                Some(card) => {
                    debug!(
                        user_id,
                        card_id = card.id,
                        last_shown = %entry.last_shown,
                        hard_count = entry.hard_count,
                        "Selected next due card"
                    );
                    return Ok(Some(DueCard {
                        entry: entry.clone(),
                        card,
                    }));
                }
                None => warn!(user_id, card_id = entry.card_id, "Due card missing from catalog, skipping"),
            }
        }

        debug!(user_id, "No due cards");
        Ok(None)
    }

    /// Number of eligible rows.
    pub fn due_count(&self, user_id: &str, now: DateTime<Utc>) -> RecallResult<usize> {
        let entries = self.progress.entries_for_user(user_id)?;
        Ok(entries.iter().filter(|e| e.is_eligible(now)).count())
    }

    /// Returns the updated row, or `None` if the user is not enrolled in the card.
    pub fn record_shown(
        &self,
        user_id: &str,
        card_id: i64,
        now: DateTime<Utc>,
    ) -> RecallResult<Option<LearningEntry>> {
        let updated = self
            .progress
            .modify_entry(user_id, card_id, &mut |entry| apply_shown(entry, now))?;
        if updated.is_none() {
            warn!(user_id, card_id, "Shown card has no progress row");
        }
        Ok(updated)
    }

    /// Returns the updated row, or `None` if the user is not enrolled in the card.
    pub fn record_outcome(
        &self,
        user_id: &str,
        card_id: i64,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> RecallResult<Option<LearningEntry>> {
        let updated = self
            .progress
            .modify_entry(user_id, card_id, &mut |entry| apply_outcome(entry, outcome, now))?;

        match &updated {
            Some(entry) => debug!(
                user_id,
                card_id,
                %outcome,
                easy_count = entry.easy_count,
                show_after = %entry.show_after,
                "Recorded outcome"
            ),
            None => warn!(user_id, card_id, "Graded card has no progress row"),
        }
        Ok(updated)
    }

    /// Enroll the user in every card of a deck. Returns the number of rows created.
    pub fn enroll_deck(&self, user_id: &str, deck: &Deck, now: DateTime<Utc>) -> RecallResult<usize> {
        let card_ids: Vec<i64> = self
            .catalog
            .cards_for_deck(deck.id)?
            .iter()
            .map(|card| card.id)
            .collect();
        self.progress.enroll(user_id, &deck.title, &card_ids, now)
    }
}
