//! Catalog import from TOML, JSON or YAML files.
//!
//! Content management owns the catalog; this loader is how a deployment seeds
//! it. Decks whose title already exists are skipped, so importing the same
//! file twice is harmless.

use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CatalogStore, SqliteCatalogStore};
use crate::error::{RecallError, RecallResult};
use crate::types::QuestionKind;

/// Top-level catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub decks: Vec<DeckEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckEntry {
    pub title: String,
    #[serde(default)]
    pub cards: Vec<CardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardEntry {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub text: String,
    #[serde(default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub text: String,
    #[serde(default)]
    pub correct: Option<bool>,
}

/// Counts from one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub decks: usize,
    pub skipped_decks: usize,
    pub cards: usize,
    pub questions: usize,
}

impl CatalogFile {
    /// Load a catalog document, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> RecallResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => toml::from_str(&content).map_err(|e| RecallError::parse(e.to_string())),
            Some("json") => serde_json::from_str(&content).map_err(|e| RecallError::parse(e.to_string())),
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| RecallError::parse(e.to_string()))
            }
            _ => Err(RecallError::validation_with_suggestion(
                "Unsupported catalog file format",
                "Use .toml, .json, or .yaml",
            )),
        }
    }

    /// Write the document into a catalog store.
    pub fn import_into(&self, store: &SqliteCatalogStore) -> RecallResult<ImportStats> {
        let mut stats = ImportStats::default();

        for deck_entry in &self.decks {
            if store.find_deck_by_title(&deck_entry.title)?.is_some() {
                debug!(title = %deck_entry.title, "Deck already present, skipping");
                stats.skipped_decks += 1;
                continue;
            }

            let (cards, questions) = store.transaction(|conn| import_deck(conn, deck_entry))?;
            stats.decks += 1;
            stats.cards += cards;
            stats.questions += questions;
        }

        info!(
            decks = stats.decks,
            skipped = stats.skipped_decks,
            cards = stats.cards,
            questions = stats.questions,
            "Catalog imported"
        );
        Ok(stats)
    }
}

/// Insert one deck with everything under it. Returns card and question counts.
fn import_deck(conn: &Connection, entry: &DeckEntry) -> RecallResult<(usize, usize)> {
    let deck = SqliteCatalogStore::insert_deck_row(conn, &entry.title)?;
    let mut questions = 0;

    for card_entry in &entry.cards {
        let card = SqliteCatalogStore::insert_card_row(
            conn,
            deck.id,
            &card_entry.front,
            &card_entry.back,
            card_entry.media_url.as_deref(),
        )?;

        for question_entry in &card_entry.questions {
            let question = SqliteCatalogStore::insert_question_row(
                conn,
                card.id,
                &question_entry.text,
                question_entry.kind,
                question_entry.image_url.as_deref(),
                question_entry.audio_url.as_deref(),
            )?;
            questions += 1;

            for answer in &question_entry.answers {
                SqliteCatalogStore::insert_answer_row(conn, question.id, &answer.text, answer.correct)?;
            }
        }
    }

    Ok((entry.cards.len(), questions))
}
