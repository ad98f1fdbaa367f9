//! Catalog types: decks, cards, questions and answers.
//!
//! Catalog content is owned by content management. The core only reads it.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A named collection of cards (a "topic").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    /// Unique title, also used as the denormalized topic name in progress rows.
    pub title: String,
}

/// A front/back learning unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    /// Owning deck. `None` once the deck has been deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<i64>,
    pub front: String,
    pub back: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

/// How a question expects to be answered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuestionKind {
    /// The learner types the answer.
    #[default]
    FreeText,
    /// The learner picks one of the answers offered as buttons.
    ButtonChoice,
}

/// A quiz question attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub card_id: i64,
    pub text: String,
    #[serde(default)]
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// A stored answer to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    /// `None` means correctness is unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

impl Answer {
    /// Answers accepted as correct for a question.
    ///
    /// A lone answer is implicitly correct. Otherwise only answers explicitly
    /// flagged `correct = true` count.
    pub fn accepted(answers: &[Answer]) -> impl Iterator<Item = &Answer> {
        let lone = answers.len() == 1;
        answers
            .iter()
            .filter(move |a| lone || a.correct == Some(true))
    }
}
