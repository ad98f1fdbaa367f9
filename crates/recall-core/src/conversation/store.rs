//! Conversation state and address storage.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::dialog::ConversationState;
use crate::error::{RecallError, RecallResult};
use crate::types::{format_timestamp, parse_timestamp, ConversationAddress};

/// Storage for dialog stacks and the address book used for reminders.
pub trait ConversationStore: Send + Sync {
    /// Load the state of a conversation, if any was saved.
    fn load_state(&self, conversation_id: &str) -> RecallResult<Option<ConversationState>>;

    /// Replace the state of a conversation in a single write.
    fn save_state(
        &self,
        conversation_id: &str,
        state: &ConversationState,
        now: DateTime<Utc>,
    ) -> RecallResult<()>;

    /// Remember where a user was last reached. One address per user.
    fn save_address(&self, address: &ConversationAddress) -> RecallResult<()>;

    fn get_address(&self, user_id: &str) -> RecallResult<Option<ConversationAddress>>;

    fn list_addresses(&self) -> RecallResult<Vec<ConversationAddress>>;
}

/// SQLite-backed conversation store.
pub struct SqliteConversationStore {
    conn: Mutex<Connection>,
}

impl SqliteConversationStore {
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
            CREATE TABLE IF NOT EXISTS conversation_state (
                conversation_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS conversation_addresses (
                user_id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                channel_id TEXT,
                service_url TEXT,
                updated_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    fn row_to_address(row: &rusqlite::Row<'_>) -> RecallResult<ConversationAddress> {
        let updated_at: String = row.get(4)?;
        Ok(ConversationAddress {
            user_id: row.get(0)?,
            conversation_id: row.get(1)?,
            channel_id: row.get(2)?,
            service_url: row.get(3)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

impl ConversationStore for SqliteConversationStore {
    fn load_state(&self, conversation_id: &str) -> RecallResult<Option<ConversationState>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT state FROM conversation_state WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_state(
        &self,
        conversation_id: &str,
        state: &ConversationState,
        now: DateTime<Utc>,
    ) -> RecallResult<()> {
        let json = serde_json::to_string(state)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO conversation_state (conversation_id, state, updated_at)
             VALUES (?1, ?2, ?3)",
            params![conversation_id, json, format_timestamp(now)],
        )?;
        debug!(conversation_id, depth = state.dialog_stack.len(), "Saved conversation state");
        Ok(())
    }

    fn save_address(&self, address: &ConversationAddress) -> RecallResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO conversation_addresses
             (user_id, conversation_id, channel_id, service_url, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                address.user_id,
                address.conversation_id,
                address.channel_id,
                address.service_url,
                format_timestamp(address.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_address(&self, user_id: &str) -> RecallResult<Option<ConversationAddress>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT user_id, conversation_id, channel_id, service_url, updated_at
             FROM conversation_addresses WHERE user_id = ?1",
            params![user_id],
            |row| Ok(Self::row_to_address(row)),
        )
        .optional()?
        .transpose()
    }

    fn list_addresses(&self) -> RecallResult<Vec<ConversationAddress>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, conversation_id, channel_id, service_url, updated_at
             FROM conversation_addresses ORDER BY user_id ASC",
        )?;
        let results = stmt.query_map([], |row| Ok(Self::row_to_address(row)))?;

        let addresses = results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect::<RecallResult<Vec<_>>>()?;
        Ok(addresses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::{DialogFrame, DialogId, DialogOptions};

    #[test]
    fn test_state_round_trip_and_overwrite() {
        let store = SqliteConversationStore::in_memory().unwrap();
        assert!(store.load_state("c1").unwrap().is_none());

        let mut state = ConversationState {
            dialog_stack: vec![DialogFrame::new(DialogId::ChooseTopic, DialogOptions::default())],
            welcomed: true,
        };
        store.save_state("c1", &state, Utc::now()).unwrap();
        assert_eq!(store.load_state("c1").unwrap().unwrap(), state);

        state.dialog_stack.clear();
        store.save_state("c1", &state, Utc::now()).unwrap();
        let loaded = store.load_state("c1").unwrap().unwrap();
        assert!(loaded.dialog_stack.is_empty());
        assert!(loaded.welcomed);
    }

    #[test]
    fn test_state_from_unknown_dialog_is_unreadable() {
        let store = SqliteConversationStore::in_memory().unwrap();
        store
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO conversation_state (conversation_id, state, updated_at) VALUES (?1, ?2, ?3)",
                params![
                    "c1",
                    r#"{"dialog_stack":[{"dialog":"old_flow","step":0}],"welcomed":true}"#,
                    format_timestamp(Utc::now())
                ],
            )
            .unwrap();

        let err = store.load_state("c1").unwrap_err();
        assert!(err.is_unreadable_data());
    }

    #[test]
    fn test_address_book_keeps_latest_per_user() {
        let store = SqliteConversationStore::in_memory().unwrap();
        let mut address = ConversationAddress {
            user_id: "u1".to_string(),
            conversation_id: "c1".to_string(),
            channel_id: Some("telegram".to_string()),
            service_url: None,
            updated_at: Utc::now(),
        };
        store.save_address(&address).unwrap();
        address.conversation_id = "c2".to_string();
        store.save_address(&address).unwrap();

        let listed = store.list_addresses().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].conversation_id, "c2");
        assert_eq!(
            store.get_address("u1").unwrap().unwrap().channel_id.as_deref(),
            Some("telegram")
        );
        assert!(store.get_address("u2").unwrap().is_none());
    }
}
