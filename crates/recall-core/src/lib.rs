//! recall-core - Core library for recall.
//!
//! This crate provides the spaced-repetition scheduler, the catalog and
//! progress stores, and the resumable dialog engine behind the recall
//! flashcard tutor.
//!
//! # Example
//!
//! ```ignore
//! use recall_core::{InboundEvent, RecallConfig, RecallRuntime};
//!
//! let runtime = RecallRuntime::new(&RecallConfig::in_memory())?;
//!
//! // Feed a message from a learner
//! let reply = runtime.turns.handle(&InboundEvent::text("conv-1", "user-1", "hi")).await?;
//! for message in reply.messages {
//!     println!("{}", message.text);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod conversation;
pub mod dialog;
pub mod error;
pub mod progress;
pub mod quiz;
pub mod reminders;
pub mod runtime;
pub mod scheduling;
pub mod turn;
pub mod types;

// Re-export commonly used types
pub use catalog::{CatalogFile, CatalogStore, SqliteCatalogStore};
pub use config::RecallConfig;
pub use conversation::{ConversationStore, SqliteConversationStore};
pub use dialog::{ConversationState, DialogEngine, DialogFrame, DialogId};
pub use error::{RecallError, RecallResult};
pub use progress::{ProgressStore, SqliteProgressStore};
pub use quiz::QuestionSelector;
pub use reminders::{Reminder, ReminderSweep};
pub use runtime::RecallRuntime;
pub use scheduling::{interval_days, Scheduler};
pub use turn::TurnController;
pub use types::{
    Answer, Button, Card, ConversationAddress, Deck, InboundEvent, LearningEntry, OutboundMessage,
    Outcome, Question, QuestionKind, TopicStats, TurnReply, User, UserStats,
};
