//! Catalog storage trait and SQLite implementation.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{RecallError, RecallResult};
use crate::types::{Answer, Card, Deck, Question, QuestionKind};

/// Read access to learning content.
pub trait CatalogStore: Send + Sync {
    /// Get a deck by id.
    fn get_deck(&self, id: i64) -> RecallResult<Option<Deck>>;

    /// Find a deck by its unique title.
    fn find_deck_by_title(&self, title: &str) -> RecallResult<Option<Deck>>;

    /// All decks, ordered by title.
    fn list_decks(&self) -> RecallResult<Vec<Deck>>;

    /// Cards currently belonging to a deck, ordered by id.
    fn cards_for_deck(&self, deck_id: i64) -> RecallResult<Vec<Card>>;

    /// Get a card by id.
    fn get_card(&self, id: i64) -> RecallResult<Option<Card>>;

    /// Questions of a card, ordered by id.
    fn questions_for_card(&self, card_id: i64) -> RecallResult<Vec<Question>>;

    /// Get a question by id.
    fn get_question(&self, id: i64) -> RecallResult<Option<Question>>;

    /// Answers of a question, ordered by id.
    fn answers_for_question(&self, question_id: i64) -> RecallResult<Vec<Answer>>;
}

/// SQLite-backed catalog.
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Open (or create) a catalog at the given path.
    pub fn new(path: impl AsRef<Path>) -> RecallResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory catalog (for testing).
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
            CREATE TABLE IF NOT EXISTS decks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                deck_id INTEGER,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                media_url TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id);

            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'free_text',
                image_url TEXT,
                audio_url TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_questions_card ON questions(card_id);

            CREATE TABLE IF NOT EXISTS answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                correct INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_answers_question ON answers(question_id);
        "#,
        )?;
        Ok(())
    }

    /// Run `f` inside one transaction. Nothing is kept if it fails.
    pub(super) fn transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> RecallResult<T>,
    ) -> RecallResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Insert a deck and return it.
    pub fn insert_deck(&self, title: &str) -> RecallResult<Deck> {
        Self::insert_deck_row(&*self.lock()?, title)
    }

    /// Insert a card into a deck and return it.
    pub fn insert_card(
        &self,
        deck_id: i64,
        front: &str,
        back: &str,
        media_url: Option<&str>,
    ) -> RecallResult<Card> {
        Self::insert_card_row(&*self.lock()?, deck_id, front, back, media_url)
    }

    /// Insert a question for a card and return it.
    pub fn insert_question(
        &self,
        card_id: i64,
        text: &str,
        kind: QuestionKind,
        image_url: Option<&str>,
        audio_url: Option<&str>,
    ) -> RecallResult<Question> {
        Self::insert_question_row(&*self.lock()?, card_id, text, kind, image_url, audio_url)
    }

    /// Insert an answer for a question and return it.
    pub fn insert_answer(
        &self,
        question_id: i64,
        text: &str,
        correct: Option<bool>,
    ) -> RecallResult<Answer> {
        Self::insert_answer_row(&*self.lock()?, question_id, text, correct)
    }

    pub(super) fn insert_deck_row(conn: &Connection, title: &str) -> RecallResult<Deck> {
        conn.execute("INSERT INTO decks (title) VALUES (?1)", params![title])?;
        Ok(Deck {
            id: conn.last_insert_rowid(),
            title: title.to_string(),
        })
    }

    pub(super) fn insert_card_row(
        conn: &Connection,
        deck_id: i64,
        front: &str,
        back: &str,
        media_url: Option<&str>,
    ) -> RecallResult<Card> {
        conn.execute(
            "INSERT INTO cards (deck_id, front, back, media_url) VALUES (?1, ?2, ?3, ?4)",
            params![deck_id, front, back, media_url],
        )?;
        Ok(Card {
            id: conn.last_insert_rowid(),
            deck_id: Some(deck_id),
            front: front.to_string(),
            back: back.to_string(),
            media_url: media_url.map(str::to_string),
        })
    }

    pub(super) fn insert_question_row(
        conn: &Connection,
        card_id: i64,
        text: &str,
        kind: QuestionKind,
        image_url: Option<&str>,
        audio_url: Option<&str>,
    ) -> RecallResult<Question> {
        conn.execute(
            "INSERT INTO questions (card_id, text, kind, image_url, audio_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![card_id, text, kind.to_string(), image_url, audio_url],
        )?;
        Ok(Question {
            id: conn.last_insert_rowid(),
            card_id,
            text: text.to_string(),
            kind,
            image_url: image_url.map(str::to_string),
            audio_url: audio_url.map(str::to_string),
        })
    }

    pub(super) fn insert_answer_row(
        conn: &Connection,
        question_id: i64,
        text: &str,
        correct: Option<bool>,
    ) -> RecallResult<Answer> {
        conn.execute(
            "INSERT INTO answers (question_id, text, correct) VALUES (?1, ?2, ?3)",
            params![question_id, text, correct],
        )?;
        Ok(Answer {
            id: conn.last_insert_rowid(),
            question_id,
            text: text.to_string(),
            correct,
        })
    }

    /// Delete a deck. Its cards stay in the catalog with no deck.
    pub fn delete_deck(&self, deck_id: i64) -> RecallResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE cards SET deck_id = NULL WHERE deck_id = ?1",
            params![deck_id],
        )?;
        let deleted = tx.execute("DELETE FROM decks WHERE id = ?1", params![deck_id])?;
        tx.commit()?;
        debug!(deck_id, deleted, "Deleted deck");
        Ok(deleted > 0)
    }

    fn row_to_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<Card> {
        Ok(Card {
            id: row.get(0)?,
            deck_id: row.get(1)?,
            front: row.get(2)?,
            back: row.get(3)?,
            media_url: row.get(4)?,
        })
    }

    fn row_to_question(row: &rusqlite::Row<'_>) -> RecallResult<Question> {
        let kind: String = row.get(3)?;
        Ok(Question {
            id: row.get(0)?,
            card_id: row.get(1)?,
            text: row.get(2)?,
            kind: QuestionKind::from_str(&kind)
                .map_err(|e| RecallError::parse(format!("question kind '{}': {}", kind, e)))?,
            image_url: row.get(4)?,
            audio_url: row.get(5)?,
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn get_deck(&self, id: i64) -> RecallResult<Option<Deck>> {
        let conn = self.lock()?;
        let deck = conn
            .query_row(
                "SELECT id, title FROM decks WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Deck {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(deck)
    }

    fn find_deck_by_title(&self, title: &str) -> RecallResult<Option<Deck>> {
        let conn = self.lock()?;
        let deck = conn
            .query_row(
                "SELECT id, title FROM decks WHERE title = ?1",
                params![title],
                |row| {
                    Ok(Deck {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(deck)
    }

    fn list_decks(&self) -> RecallResult<Vec<Deck>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, title FROM decks ORDER BY title ASC")?;
        let decks = stmt
            .query_map([], |row| {
                Ok(Deck {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decks)
    }

    fn cards_for_deck(&self, deck_id: i64) -> RecallResult<Vec<Card>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, deck_id, front, back, media_url FROM cards
             WHERE deck_id = ?1 ORDER BY id ASC",
        )?;
        let cards = stmt
            .query_map(params![deck_id], Self::row_to_card)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    fn get_card(&self, id: i64) -> RecallResult<Option<Card>> {
        let conn = self.lock()?;
        let card = conn
            .query_row(
                "SELECT id, deck_id, front, back, media_url FROM cards WHERE id = ?1",
                params![id],
                Self::row_to_card,
            )
            .optional()?;
        Ok(card)
    }

    fn questions_for_card(&self, card_id: i64) -> RecallResult<Vec<Question>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, card_id, text, kind, image_url, audio_url FROM questions
             WHERE card_id = ?1 ORDER BY id ASC",
        )?;
        let results = stmt.query_map(params![card_id], |row| Ok(Self::row_to_question(row)))?;

        let questions = results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect::<RecallResult<Vec<_>>>()?;
        Ok(questions)
    }

    fn get_question(&self, id: i64) -> RecallResult<Option<Question>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, card_id, text, kind, image_url, audio_url FROM questions WHERE id = ?1",
            params![id],
            |row| Ok(Self::row_to_question(row)),
        )
        .optional()?
        .transpose()
    }

    fn answers_for_question(&self, question_id: i64) -> RecallResult<Vec<Answer>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, question_id, text, correct FROM answers
             WHERE question_id = ?1 ORDER BY id ASC",
        )?;
        let answers = stmt
            .query_map(params![question_id], |row| {
                Ok(Answer {
                    id: row.get(0)?,
                    question_id: row.get(1)?,
                    text: row.get(2)?,
                    correct: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(answers)
    }
}
