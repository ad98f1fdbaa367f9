//! Catalog of learning content: decks, cards, questions and answers.

mod import;
mod store;

pub use import::{AnswerEntry, CardEntry, CatalogFile, DeckEntry, ImportStats, QuestionEntry};
pub use store::{CatalogStore, SqliteCatalogStore};
