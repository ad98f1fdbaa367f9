//! Per-conversation persistence: dialog stacks and reply addresses.

mod store;

pub use store::{ConversationStore, SqliteConversationStore};
