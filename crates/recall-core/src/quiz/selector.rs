//! Question selection and answer grading for card quizzes.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::CatalogStore;
use crate::error::{RecallError, RecallResult};
use crate::progress::ProgressStore;
use crate::types::{Answer, Question};

/// Picks quiz questions so that every question of a card is asked once
/// before any repeats, and grades replies.
pub struct QuestionSelector {
    progress: Arc<dyn ProgressStore>,
    catalog: Arc<dyn CatalogStore>,
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl QuestionSelector {
    pub fn new(progress: Arc<dyn ProgressStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { progress, catalog }
    }

    pub fn has_question(&self, card_id: i64) -> RecallResult<bool> {
        Ok(!self.catalog.questions_for_card(card_id)?.is_empty())
    }

    /// The first question (by id) not yet asked in the current cycle.
    ///
    /// When every question has been asked, the cycle restarts. Fails with
    /// not-found only if the card has no questions at all.
    pub fn next_question(&self, user_id: &str, card_id: i64) -> RecallResult<Question> {
        let questions = self.catalog.questions_for_card(card_id)?;
        if questions.is_empty() {
            return Err(RecallError::question_not_found(format!(
                "card {} has no questions",
                card_id
            )));
        }

        let shown: HashSet<i64> = self
            .progress
            .shown_questions(user_id, card_id)?
            .into_iter()
            .collect();

        if let Some(question) = questions.iter().find(|q| !shown.contains(&q.id)) {
            return Ok(question.clone());
        }

        let reset = self.progress.reset_shown_questions(user_id, card_id)?;
        debug!(user_id, card_id, reset, "All questions asked, starting a new cycle");

        let mut questions = questions;
        Ok(questions.swap_remove(0))
    }

    /// Idempotent.
    pub fn mark_shown(&self, user_id: &str, card_id: i64, question_id: i64) -> RecallResult<()> {
        self.progress
            .mark_question_shown(user_id, card_id, question_id)?;
        Ok(())
    }

    /// Answers offered as buttons for a question, in id order.
    pub fn answer_choices(&self, question: &Question) -> RecallResult<Vec<Answer>> {
        self.catalog.answers_for_question(question.id)
    }

    /// Case-insensitive match of the trimmed reply against the accepted answers.
    pub fn check_answer(&self, text: &str, question: &Question) -> RecallResult<bool> {
        let answers = self.catalog.answers_for_question(question.id)?;
        let correct = Answer::accepted(&answers).any(|a| same_text(&a.text, text));
        Ok(correct)
    }

    /// Whether the accepted answer is something other than the card's back.
    ///
    /// When it is, the answer is revealed after a wrong reply, since the
    /// learner cannot infer it from the card.
    pub fn correct_answer_differs_from_card_back(&self, question: &Question) -> RecallResult<bool> {
        let Some(card) = self.catalog.get_card(question.card_id)? else {
            return Ok(true);
        };
        let answers = self.catalog.answers_for_question(question.id)?;
        let matches_back = Answer::accepted(&answers).any(|a| same_text(&a.text, &card.back));
        Ok(!matches_back)
    }

    /// Text of the first accepted answer.
    pub fn correct_answer(&self, question: &Question) -> RecallResult<Option<String>> {
        let answers = self.catalog.answers_for_question(question.id)?;
        let text = Answer::accepted(&answers).next().map(|a| a.text.clone());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalogStore;
    use crate::progress::SqliteProgressStore;
    use crate::types::QuestionKind;

    struct Fixture {
        selector: QuestionSelector,
        progress: Arc<SqliteProgressStore>,
        catalog: Arc<SqliteCatalogStore>,
        card_id: i64,
    }

    fn fixture(question_count: usize) -> Fixture {
        let catalog = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let progress = Arc::new(SqliteProgressStore::in_memory().unwrap());
        let deck = catalog.insert_deck("Capitals").unwrap();
        let card = catalog.insert_card(deck.id, "France", "Paris", None).unwrap();
        for i in 0..question_count {
            let q = catalog
                .insert_question(card.id, &format!("Q{}", i), QuestionKind::FreeText, None, None)
                .unwrap();
            catalog.insert_answer(q.id, "Paris", None).unwrap();
        }
        Fixture {
            selector: QuestionSelector::new(progress.clone(), catalog.clone()),
            progress,
            catalog,
            card_id: card.id,
        }
    }

    #[test]
    fn test_cycle_visits_each_question_then_resets() {
        let f = fixture(3);

        let mut asked = Vec::new();
        for _ in 0..3 {
            let q = f.selector.next_question("u1", f.card_id).unwrap();
            f.selector.mark_shown("u1", f.card_id, q.id).unwrap();
            asked.push(q.id);
        }
        let distinct: HashSet<i64> = asked.iter().copied().collect();
        assert_eq!(distinct.len(), 3);

        let again = f.selector.next_question("u1", f.card_id).unwrap();
        assert_eq!(again.id, asked[0]);
        assert!(f.progress.shown_questions("u1", f.card_id).unwrap().is_empty());

        f.selector.mark_shown("u1", f.card_id, again.id).unwrap();
        assert_eq!(f.progress.shown_questions("u1", f.card_id).unwrap().len(), 1);
    }

    #[test]
    fn test_cycles_are_per_user() {
        let f = fixture(2);
        let q = f.selector.next_question("u1", f.card_id).unwrap();
        f.selector.mark_shown("u1", f.card_id, q.id).unwrap();

        assert_eq!(f.selector.next_question("u2", f.card_id).unwrap().id, q.id);
        assert_ne!(f.selector.next_question("u1", f.card_id).unwrap().id, q.id);
    }

    #[test]
    fn test_card_without_questions() {
        let f = fixture(0);
        assert!(!f.selector.has_question(f.card_id).unwrap());
        let err = f.selector.next_question("u1", f.card_id).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_check_answer_ignores_case_and_whitespace() {
        let f = fixture(1);
        let q = f.selector.next_question("u1", f.card_id).unwrap();

        assert!(f.selector.check_answer("paris", &q).unwrap());
        assert!(f.selector.check_answer("  PARIS ", &q).unwrap());
        assert!(!f.selector.check_answer("Lyon", &q).unwrap());
    }

    #[test]
    fn test_multi_answer_question_accepts_only_flagged() {
        let f = fixture(0);
        let q = f
            .catalog
            .insert_question(f.card_id, "Pick", QuestionKind::ButtonChoice, None, None)
            .unwrap();
        f.catalog.insert_answer(q.id, "Lyon", Some(false)).unwrap();
        f.catalog.insert_answer(q.id, "Nice", None).unwrap();
        f.catalog.insert_answer(q.id, "Paris", Some(true)).unwrap();

        assert!(f.selector.check_answer("Paris", &q).unwrap());
        assert!(!f.selector.check_answer("Nice", &q).unwrap());
        assert_eq!(f.selector.answer_choices(&q).unwrap().len(), 3);
        assert_eq!(f.selector.correct_answer(&q).unwrap().as_deref(), Some("Paris"));
    }

    #[test]
    fn test_correct_answer_differs_from_card_back() {
        let f = fixture(1);
        let same = f.selector.next_question("u1", f.card_id).unwrap();
        assert!(!f.selector.correct_answer_differs_from_card_back(&same).unwrap());

        let other = f
            .catalog
            .insert_question(f.card_id, "Largest river?", QuestionKind::FreeText, None, None)
            .unwrap();
        f.catalog.insert_answer(other.id, "Loire", None).unwrap();
        assert!(f.selector.correct_answer_differs_from_card_back(&other).unwrap());
    }
}
