//! Progress storage trait and SQLite implementation.
//!
//! Holds users, learning-matrix rows and shown-question marks. These are the
//! only catalog-adjacent rows the core itself mutates.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{RecallError, RecallResult};
use crate::types::{
    format_timestamp, parse_timestamp, LearningEntry, TopicStats, User, UserStats,
};

/// Per-user learning state.
pub trait ProgressStore: Send + Sync {
    /// Create the user if missing and stamp the interaction time.
    fn upsert_user(&self, user_id: &str, now: DateTime<Utc>) -> RecallResult<User>;

    /// Get a user by id.
    fn get_user(&self, user_id: &str) -> RecallResult<Option<User>>;

    /// Create one fresh row per card. Existing rows are left untouched.
    /// Returns the number of rows created.
    fn enroll(
        &self,
        user_id: &str,
        deck_title: &str,
        card_ids: &[i64],
        now: DateTime<Utc>,
    ) -> RecallResult<usize>;

    /// All rows of a user.
    fn entries_for_user(&self, user_id: &str) -> RecallResult<Vec<LearningEntry>>;

    /// The row for one card.
    fn get_entry(&self, user_id: &str, card_id: i64) -> RecallResult<Option<LearningEntry>>;

    /// Read-modify-write one row inside a transaction.
    ///
    /// Returns the updated row, or `None` if the user is not enrolled in the card.
    fn modify_entry(
        &self,
        user_id: &str,
        card_id: i64,
        update: &mut dyn FnMut(&mut LearningEntry),
    ) -> RecallResult<Option<LearningEntry>>;

    /// Delete every row of a topic. Returns the number of rows deleted.
    fn drop_topic(&self, user_id: &str, deck_title: &str) -> RecallResult<usize>;

    /// Titles of topics the user has rows for.
    fn enrolled_topics(&self, user_id: &str) -> RecallResult<Vec<String>>;

    /// Question ids already asked for a card.
    fn shown_questions(&self, user_id: &str, card_id: i64) -> RecallResult<Vec<i64>>;

    /// Mark a question as asked. Returns false if it was already marked.
    fn mark_question_shown(
        &self,
        user_id: &str,
        card_id: i64,
        question_id: i64,
    ) -> RecallResult<bool>;

    /// Forget all marks for a card. Returns the number of marks removed.
    fn reset_shown_questions(&self, user_id: &str, card_id: i64) -> RecallResult<usize>;

    /// Per-topic progress summary.
    fn topic_stats(&self, user_id: &str) -> RecallResult<Vec<TopicStats>>;

    /// Progress summary across all topics.
    fn user_stats(&self, user_id: &str) -> RecallResult<UserStats> {
        Ok(UserStats {
            user_id: user_id.to_string(),
            topics: self.topic_stats(user_id)?,
        })
    }
}

/// SQLite-backed progress store.
pub struct SqliteProgressStore {
    conn: Mutex<Connection>,
}

const ENTRY_COLUMNS: &str = "user_id, card_id, deck_title, last_shown, show_after, \
                             show_count, easy_count, hard_count, created_at";

impl SqliteProgressStore {
    /// Open (or create) a store at the given path.
    pub fn new(path: impl AsRef<Path>) -> RecallResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> RecallResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> RecallResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RecallError::database(e.to_string()))
    }

    fn init_schema(&self) -> RecallResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                last_interaction_time TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS learning_matrix (
                user_id TEXT NOT NULL,
                card_id INTEGER NOT NULL,
                deck_title TEXT NOT NULL,
                last_shown TEXT NOT NULL,
                show_after TEXT NOT NULL,
                show_count INTEGER NOT NULL DEFAULT 0,
                easy_count INTEGER NOT NULL DEFAULT 0,
                hard_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, card_id)
            );

            CREATE INDEX IF NOT EXISTS idx_learning_matrix_topic
                ON learning_matrix(user_id, deck_title);

            CREATE TABLE IF NOT EXISTS shown_questions (
                user_id TEXT NOT NULL,
                card_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                PRIMARY KEY (user_id, card_id, question_id)
            );
        "#,
        )?;
        Ok(())
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> RecallResult<LearningEntry> {
        let last_shown: String = row.get(3)?;
        let show_after: String = row.get(4)?;
        let created_at: String = row.get(8)?;

        Ok(LearningEntry {
            user_id: row.get(0)?,
            card_id: row.get(1)?,
            deck_title: row.get(2)?,
            last_shown: parse_timestamp(&last_shown)?,
            show_after: parse_timestamp(&show_after)?,
            show_count: row.get(5)?,
            easy_count: row.get(6)?,
            hard_count: row.get(7)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn select_entry(
        conn: &Connection,
        user_id: &str,
        card_id: i64,
    ) -> RecallResult<Option<LearningEntry>> {
        conn.query_row(
            &format!(
                "SELECT {} FROM learning_matrix WHERE user_id = ?1 AND card_id = ?2",
                ENTRY_COLUMNS
            ),
            params![user_id, card_id],
            |row| Ok(Self::row_to_entry(row)),
        )
        .optional()?
        .transpose()
    }
}

impl ProgressStore for SqliteProgressStore {
    fn upsert_user(&self, user_id: &str, now: DateTime<Utc>) -> RecallResult<User> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, last_interaction_time) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET last_interaction_time = excluded.last_interaction_time",
            params![user_id, format_timestamp(now)],
        )?;
        Ok(User {
            id: user_id.to_string(),
            last_interaction_time: now,
        })
    }

    fn get_user(&self, user_id: &str) -> RecallResult<Option<User>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, last_interaction_time FROM users WHERE id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(id, last)| {
            Ok(User {
                id,
                last_interaction_time: parse_timestamp(&last)?,
            })
        })
        .transpose()
    }

    fn enroll(
        &self,
        user_id: &str,
        deck_title: &str,
        card_ids: &[i64],
        now: DateTime<Utc>,
    ) -> RecallResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut created = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO learning_matrix
                 (user_id, card_id, deck_title, last_shown, show_after,
                  show_count, easy_count, hard_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for &card_id in card_ids {
                let entry = LearningEntry::enrolled(user_id, card_id, deck_title, now);
                created += stmt.execute(params![
                    entry.user_id,
                    entry.card_id,
                    entry.deck_title,
                    format_timestamp(entry.last_shown),
                    format_timestamp(entry.show_after),
                    entry.show_count,
                    entry.easy_count,
                    entry.hard_count,
                    format_timestamp(entry.created_at),
                ])?;
            }
        }
        tx.commit()?;

        info!(user_id, deck_title, created, requested = card_ids.len(), "Enrolled topic");
        Ok(created)
    }

    fn entries_for_user(&self, user_id: &str) -> RecallResult<Vec<LearningEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM learning_matrix WHERE user_id = ?1 ORDER BY card_id ASC",
            ENTRY_COLUMNS
        ))?;
        let results = stmt.query_map(params![user_id], |row| Ok(Self::row_to_entry(row)))?;

        let entries = results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect::<RecallResult<Vec<_>>>()?;
        Ok(entries)
    }

    fn get_entry(&self, user_id: &str, card_id: i64) -> RecallResult<Option<LearningEntry>> {
        let conn = self.lock()?;
        Self::select_entry(&conn, user_id, card_id)
    }

    fn modify_entry(
        &self,
        user_id: &str,
        card_id: i64,
        update: &mut dyn FnMut(&mut LearningEntry),
    ) -> RecallResult<Option<LearningEntry>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let Some(mut entry) = Self::select_entry(&tx, user_id, card_id)? else {
            return Ok(None);
        };
        update(&mut entry);

        tx.execute(
            "UPDATE learning_matrix SET
             last_shown = ?3, show_after = ?4, show_count = ?5, easy_count = ?6, hard_count = ?7
             WHERE user_id = ?1 AND card_id = ?2",
            params![
                user_id,
                card_id,
                format_timestamp(entry.last_shown),
                format_timestamp(entry.show_after),
                entry.show_count,
                entry.easy_count,
                entry.hard_count,
            ],
        )?;
        tx.commit()?;

        Ok(Some(entry))
    }

    fn drop_topic(&self, user_id: &str, deck_title: &str) -> RecallResult<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM learning_matrix WHERE user_id = ?1 AND deck_title = ?2",
            params![user_id, deck_title],
        )?;
        info!(user_id, deck_title, deleted, "Dropped topic");
        Ok(deleted)
    }

    fn enrolled_topics(&self, user_id: &str) -> RecallResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT deck_title FROM learning_matrix
             WHERE user_id = ?1 ORDER BY deck_title ASC",
        )?;
        let titles = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    fn shown_questions(&self, user_id: &str, card_id: i64) -> RecallResult<Vec<i64>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT question_id FROM shown_questions
             WHERE user_id = ?1 AND card_id = ?2 ORDER BY question_id ASC",
        )?;
        let ids = stmt
            .query_map(params![user_id, card_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn mark_question_shown(
        &self,
        user_id: &str,
        card_id: i64,
        question_id: i64,
    ) -> RecallResult<bool> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO shown_questions (user_id, card_id, question_id)
             VALUES (?1, ?2, ?3)",
            params![user_id, card_id, question_id],
        )?;
        Ok(inserted > 0)
    }

    fn reset_shown_questions(&self, user_id: &str, card_id: i64) -> RecallResult<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM shown_questions WHERE user_id = ?1 AND card_id = ?2",
            params![user_id, card_id],
        )?;
        debug!(user_id, card_id, deleted, "Reset shown questions");
        Ok(deleted)
    }

    fn topic_stats(&self, user_id: &str) -> RecallResult<Vec<TopicStats>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT deck_title,
                    COUNT(*),
                    MIN(created_at),
                    SUM(CASE WHEN easy_count > 0 THEN 1 ELSE 0 END)
             FROM learning_matrix
             WHERE user_id = ?1
             GROUP BY deck_title
             ORDER BY deck_title ASC",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(deck_title, card_count, started_at, learned)| {
                Ok(TopicStats {
                    deck_title,
                    card_count,
                    started_at: parse_timestamp(&started_at)?,
                    learned_percent: learned * 100 / card_count.max(1),
                })
            })
            .collect()
    }
}
