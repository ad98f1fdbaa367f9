//! Dialog engine: runs the persisted dialog stack for one turn.
//!
//! Nothing lives in memory between turns. The caller loads the stack, the
//! engine advances it in place, and the caller saves it again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::catalog::CatalogStore;
use crate::dialog::flows;
use crate::dialog::types::{
    DialogFrame, DialogId, DialogOptions, FrameValues, InputRequest, StepInput, StepOutcome,
    Waiting,
};
use crate::error::{RecallError, RecallResult};
use crate::progress::ProgressStore;
use crate::quiz::QuestionSelector;
use crate::scheduling::Scheduler;
use crate::types::OutboundMessage;

/// Upper bound on step runs and stack transitions in a single turn.
pub const DEFAULT_MAX_TRANSITIONS: usize = 64;

const CANCELLING: &str = "Cancelling.";

/// Collaborators available to dialog steps.
pub struct Services {
    pub catalog: Arc<dyn CatalogStore>,
    pub progress: Arc<dyn ProgressStore>,
    pub scheduler: Scheduler,
    pub selector: QuestionSelector,
}

impl Services {
    pub fn new(catalog: Arc<dyn CatalogStore>, progress: Arc<dyn ProgressStore>) -> Self {
        Self {
            scheduler: Scheduler::new(progress.clone(), catalog.clone()),
            selector: QuestionSelector::new(progress.clone(), catalog.clone()),
            catalog,
            progress,
        }
    }
}

/// Everything a step may look at or touch.
pub struct StepContext<'a> {
    pub user_id: &'a str,
    pub now: DateTime<Utc>,
    pub services: &'a Services,
    pub options: &'a DialogOptions,
    pub values: &'a mut FrameValues,
    outbox: &'a mut Vec<OutboundMessage>,
}

impl StepContext<'_> {
    /// Queue a message for this turn.
    pub fn send(&mut self, message: OutboundMessage) {
        self.outbox.push(message);
    }

    /// Queue a plain text message.
    pub fn say(&mut self, text: impl Into<String>) {
        self.send(OutboundMessage::text(text));
    }
}

/// A dialog step.
pub type StepFn = fn(&mut StepContext<'_>, StepInput) -> RecallResult<StepOutcome>;

/// Reserved commands checked before every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Help,
    Drop,
    Cancel,
}

impl Interruption {
    pub fn detect(reply: Option<&str>) -> Option<Self> {
        let text = reply?.trim().to_lowercase();
        match text.as_str() {
            "help" | "?" => Some(Interruption::Help),
            "drop" => Some(Interruption::Drop),
            "cancel" | "quit" => Some(Interruption::Cancel),
            _ => None,
        }
    }
}

/// Runs dialogs against a stack.
pub struct DialogEngine {
    services: Services,
    max_transitions: usize,
}

impl DialogEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, progress: Arc<dyn ProgressStore>) -> Self {
        Self {
            services: Services::new(catalog, progress),
            max_transitions: DEFAULT_MAX_TRANSITIONS,
        }
    }

    /// Builder method to change the per-turn transition bound.
    pub fn with_max_transitions(mut self, max_transitions: usize) -> Self {
        self.max_transitions = max_transitions;
        self
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Advance the stack by one inbound message.
    ///
    /// Returns the messages to send, in order. On error the stack may be
    /// partially advanced; callers keep their own copy if they need to roll back.
    pub fn continue_turn(
        &self,
        user_id: &str,
        reply: Option<&str>,
        now: DateTime<Utc>,
        stack: &mut Vec<DialogFrame>,
    ) -> RecallResult<Vec<OutboundMessage>> {
        let mut outbox = Vec::new();

        let mut next = match Interruption::detect(reply) {
            Some(Interruption::Cancel) => {
                info!(user_id, depth = stack.len(), "Cancelling all dialogs");
                outbox.push(OutboundMessage::text(CANCELLING));
                stack.clear();
                return Ok(outbox);
            }
            Some(interruption) => {
                let dialog = match interruption {
                    Interruption::Drop => DialogId::DropTopic,
                    _ => DialogId::InterruptionMenu,
                };
                if stack.last().is_some_and(|top| top.dialog == dialog) {
                    self.resume(stack, reply, &mut outbox)
                } else {
                    let card_id = Self::current_card(stack);
                    // One interruption at a time: a new one takes the place of the open one.
                    if Self::interruption_on_top(stack) {
                        stack.pop();
                    }
                    debug!(user_id, %dialog, ?card_id, "Interruption");
                    stack.push(DialogFrame::new(dialog, DialogOptions::with_card(card_id)));
                    Some(StepInput::None)
                }
            }
            None => self.resume(stack, reply, &mut outbox),
        };

        let mut transitions = 0;
        while let Some(input) = next.take() {
            transitions += 1;
            if transitions > self.max_transitions {
                return Err(RecallError::internal(format!(
                    "dialog did not settle within {} transitions",
                    self.max_transitions
                )));
            }

            let frame = stack
                .last_mut()
                .ok_or_else(|| RecallError::internal("step scheduled on an empty dialog stack"))?;
            let outcome = Self::run_step(&self.services, user_id, now, frame, input, &mut outbox)?;
            next = Self::apply(outcome, stack, &mut outbox);
        }

        Ok(outbox)
    }

    /// Work out what to run for a message that is not an interruption.
    fn resume(
        &self,
        stack: &mut Vec<DialogFrame>,
        reply: Option<&str>,
        outbox: &mut Vec<OutboundMessage>,
    ) -> Option<StepInput> {
        if stack.is_empty() {
            stack.push(DialogFrame::new(DialogId::ROOT, DialogOptions::default()));
            return Some(StepInput::None);
        }

        let top = stack.last_mut()?;
        match top.waiting.take() {
            Some(Waiting::Prompt { request }) => match request.recognize(reply) {
                Some(value) => Some(StepInput::Reply(value)),
                None => {
                    debug!(dialog = %top.dialog, step = top.step, "Reply not recognized, prompting again");
                    outbox.push(OutboundMessage::text(request.retry_text()));
                    outbox.push(request.message.clone());
                    top.waiting = Some(Waiting::Prompt { request });
                    None
                }
            },
            // A frame waiting on a child that is gone: resume it as if the child ended.
            Some(Waiting::Child) | None => Some(StepInput::Child(Default::default())),
        }
    }

    fn run_step(
        services: &Services,
        user_id: &str,
        now: DateTime<Utc>,
        frame: &mut DialogFrame,
        input: StepInput,
        outbox: &mut Vec<OutboundMessage>,
    ) -> RecallResult<StepOutcome> {
        let steps = flows::steps(frame.dialog);
        let Some(step) = steps.get(frame.step) else {
            return Ok(StepOutcome::EndDialog(Default::default()));
        };

        debug!(user_id, dialog = %frame.dialog, step = frame.step, "Running step");
        let mut ctx = StepContext {
            user_id,
            now,
            services,
            options: &frame.options,
            values: &mut frame.values,
            outbox,
        };
        step(&mut ctx, input)
    }

    /// Apply an outcome to the stack. Returns the input for the next step to
    /// run now, or `None` when the turn is over.
    fn apply(
        outcome: StepOutcome,
        stack: &mut Vec<DialogFrame>,
        outbox: &mut Vec<OutboundMessage>,
    ) -> Option<StepInput> {
        match outcome {
            StepOutcome::Continue(request) => {
                let frame = stack.last_mut()?;
                frame.step += 1;
                match request {
                    Some(request) => {
                        Self::send_prompt(frame, request, outbox);
                        None
                    }
                    None => Some(StepInput::None),
                }
            }
            StepOutcome::EndDialog(result) => {
                let ended = stack.pop()?;
                debug!(dialog = %ended.dialog, ?result, "Dialog ended");
                let parent = stack.last_mut()?;
                match parent.waiting.take() {
                    Some(Waiting::Prompt { request }) => {
                        Self::send_prompt(parent, request, outbox);
                        None
                    }
                    Some(Waiting::Child) | None => Some(StepInput::Child(result)),
                }
            }
            StepOutcome::ReplaceDialog(dialog, options) => {
                stack.pop();
                stack.push(DialogFrame::new(dialog, options));
                Some(StepInput::None)
            }
            StepOutcome::BeginChildDialog(dialog, options) => {
                if let Some(parent) = stack.last_mut() {
                    parent.step += 1;
                    parent.waiting = Some(Waiting::Child);
                }
                stack.push(DialogFrame::new(dialog, options));
                Some(StepInput::None)
            }
            StepOutcome::CancelAll(restart) => {
                stack.clear();
                let dialog = restart?;
                stack.push(DialogFrame::new(dialog, DialogOptions::default()));
                Some(StepInput::None)
            }
        }
    }

    fn send_prompt(frame: &mut DialogFrame, request: InputRequest, outbox: &mut Vec<OutboundMessage>) {
        outbox.push(request.message.clone());
        frame.waiting = Some(Waiting::Prompt { request });
    }

    fn interruption_on_top(stack: &[DialogFrame]) -> bool {
        stack.last().is_some_and(|f| f.dialog.is_interruption())
    }

    /// The card of the nearest frame carrying one.
    fn current_card(stack: &[DialogFrame]) -> Option<i64> {
        stack.iter().rev().find_map(DialogFrame::card_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalogStore;
    use crate::progress::SqliteProgressStore;
    use crate::types::{Answer, Card, Deck, Question, QuestionKind};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Harness {
        engine: DialogEngine,
        catalog: Arc<SqliteCatalogStore>,
        progress: Arc<SqliteProgressStore>,
        stack: Vec<DialogFrame>,
        now: DateTime<Utc>,
    }

    impl Harness {
        fn new() -> Self {
            let catalog = Arc::new(SqliteCatalogStore::in_memory().unwrap());
            let progress = Arc::new(SqliteProgressStore::in_memory().unwrap());
            Self {
                engine: DialogEngine::new(catalog.clone(), progress.clone()),
                catalog,
                progress,
                stack: Vec::new(),
                now: Utc::now(),
            }
        }

        fn send(&mut self, text: &str) -> Vec<String> {
            self.engine
                .continue_turn("u1", Some(text), self.now, &mut self.stack)
                .unwrap()
                .into_iter()
                .map(|m| m.text)
                .collect()
        }

        fn top(&self) -> DialogId {
            self.stack.last().unwrap().dialog
        }
    }

    fn with_deck(h: &Harness) {
        let deck = h.catalog.insert_deck("Capitals").unwrap();
        h.catalog.insert_card(deck.id, "France", "Paris", None).unwrap();
    }

    #[test]
    fn test_detect_interruption() {
        assert_eq!(Interruption::detect(Some(" HELP ")), Some(Interruption::Help));
        assert_eq!(Interruption::detect(Some("?")), Some(Interruption::Help));
        assert_eq!(Interruption::detect(Some("Drop")), Some(Interruption::Drop));
        assert_eq!(Interruption::detect(Some("quit")), Some(Interruption::Cancel));
        assert_eq!(Interruption::detect(Some("helpful")), None);
        assert_eq!(Interruption::detect(None), None);
    }

    #[test]
    fn test_empty_stack_begins_root_dialog() {
        let mut h = Harness::new();
        with_deck(&h);

        let texts = h.send("hi");
        assert_eq!(h.top(), DialogId::ChooseTopic);
        assert!(texts.last().unwrap().contains("topics"));
    }

    #[test]
    fn test_unrecognized_choice_reprompts() {
        let mut h = Harness::new();
        with_deck(&h);
        h.send("hi");
        let before = h.stack.clone();

        let texts = h.send("Rivers");
        assert_eq!(texts[0], "Please choose one of the options.");
        assert_eq!(texts.len(), 2);
        assert_eq!(h.stack, before);
    }

    #[test]
    fn test_cancel_clears_stack() {
        let mut h = Harness::new();
        with_deck(&h);
        h.send("hi");

        let texts = h.send("cancel");
        assert_eq!(texts, vec!["Cancelling."]);
        assert!(h.stack.is_empty());
    }

    #[test]
    fn test_help_menu_returns_to_interrupted_prompt() {
        let mut h = Harness::new();
        with_deck(&h);
        h.send("hi");
        let prompt = h.stack.last().unwrap().clone();

        h.send("help");
        assert_eq!(h.top(), DialogId::InterruptionMenu);
        assert_eq!(h.stack.len(), 2);

        // Help again while the menu is open flows to the menu as a reply.
        let texts = h.send("?");
        assert_eq!(texts[0], "Please choose one of the options.");
        assert_eq!(h.stack.len(), 2);

        let texts = h.send("<< Back to topic");
        assert_eq!(h.stack, vec![prompt.clone()]);
        let Some(Waiting::Prompt { request }) = &prompt.waiting else {
            panic!("expected a prompt");
        };
        assert_eq!(texts, vec![request.message.text.clone()]);
    }

    #[test]
    fn test_drop_from_help_menu_replaces_menu() {
        let mut h = Harness::new();
        let deck = h.catalog.insert_deck("Capitals").unwrap();
        let card = h.catalog.insert_card(deck.id, "France", "Paris", None).unwrap();
        h.progress.enroll("u1", "Capitals", &[card.id], h.now).unwrap();
        h.stack = vec![DialogFrame::new(DialogId::InitialLearning, DialogOptions::default())];
        let texts = h
            .engine
            .continue_turn("u1", None, h.now, &mut h.stack)
            .unwrap();
        assert_eq!(texts.last().unwrap().text, "France");

        h.send("help");
        assert_eq!(h.top(), DialogId::InterruptionMenu);

        let texts = h.send("drop");
        assert_eq!(
            texts,
            vec!["Do you really want to drop Capitals? Your progress in this topic will be lost."]
        );
        assert_eq!(h.top(), DialogId::DropTopic);
        assert_eq!(h.stack.len(), 2);
        assert_eq!(h.stack[1].options.card_id, Some(card.id));

        // Drop again while confirming is just an unrecognized answer.
        let texts = h.send("drop");
        assert_eq!(texts[0], "Please choose one of the options.");
        assert_eq!(h.stack.len(), 2);

        let texts = h.send("No");
        assert_eq!(texts, vec!["France"]);
        assert_eq!(h.top(), DialogId::InitialLearning);
    }

    #[test]
    fn test_decks_without_cards_are_not_offered() {
        let mut h = Harness::new();
        h.catalog.insert_deck("Empty").unwrap();
        with_deck(&h);

        h.send("hi");
        let Some(Waiting::Prompt { request }) = &h.stack[0].waiting else {
            panic!("expected a prompt");
        };
        let labels: Vec<&str> = request.message.buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Capitals"]);

        let texts = h.send("Empty");
        assert_eq!(texts[0], "Please choose one of the options.");
    }

    #[test]
    fn test_confirming_a_deck_that_lost_its_cards() {
        let mut h = Harness::new();
        let rivers = h.catalog.insert_deck("Rivers").unwrap();
        with_deck(&h);

        let mut frame = DialogFrame::new(DialogId::ChooseTopic, DialogOptions::default());
        frame.step = 2;
        frame.values.deck_id = Some(rivers.id);
        frame.waiting = Some(Waiting::Prompt {
            request: InputRequest::choice("Do you want to start learning Rivers?", ["Yes", "No"]),
        });
        h.stack = vec![frame];

        let texts = h.send("Yes");
        assert_eq!(texts[0], "Sorry, Rivers has no cards yet.");
        assert_eq!(texts[1], "I have these topics for you to learn. Please choose one:");
        assert!(h.progress.enrolled_topics("u1").unwrap().is_empty());
    }

    /// Catalog whose card lookups can be switched off.
    struct FlakyCatalog {
        inner: Arc<SqliteCatalogStore>,
        cards_offline: AtomicBool,
    }

    impl CatalogStore for FlakyCatalog {
        fn get_deck(&self, id: i64) -> RecallResult<Option<Deck>> {
            self.inner.get_deck(id)
        }
        fn find_deck_by_title(&self, title: &str) -> RecallResult<Option<Deck>> {
            self.inner.find_deck_by_title(title)
        }
        fn list_decks(&self) -> RecallResult<Vec<Deck>> {
            self.inner.list_decks()
        }
        fn cards_for_deck(&self, deck_id: i64) -> RecallResult<Vec<Card>> {
            self.inner.cards_for_deck(deck_id)
        }
        fn get_card(&self, id: i64) -> RecallResult<Option<Card>> {
            if self.cards_offline.load(Ordering::SeqCst) {
                return Err(RecallError::database("catalog offline"));
            }
            self.inner.get_card(id)
        }
        fn questions_for_card(&self, card_id: i64) -> RecallResult<Vec<Question>> {
            self.inner.questions_for_card(card_id)
        }
        fn get_question(&self, id: i64) -> RecallResult<Option<Question>> {
            self.inner.get_question(id)
        }
        fn answers_for_question(&self, question_id: i64) -> RecallResult<Vec<Answer>> {
            self.inner.answers_for_question(question_id)
        }
    }

    #[test]
    fn test_failed_reveal_does_not_count_as_shown() {
        let h = Harness::new();
        let deck = h.catalog.insert_deck("Capitals").unwrap();
        let card = h.catalog.insert_card(deck.id, "France", "Paris", None).unwrap();
        h.progress.enroll("u1", "Capitals", &[card.id], h.now).unwrap();

        let catalog = Arc::new(FlakyCatalog {
            inner: h.catalog.clone(),
            cards_offline: AtomicBool::new(false),
        });
        let engine = DialogEngine::new(catalog.clone(), h.progress.clone());
        let mut stack = vec![DialogFrame::new(DialogId::InitialLearning, DialogOptions::default())];
        engine.continue_turn("u1", None, h.now, &mut stack).unwrap();
        let before = stack.clone();

        catalog.cards_offline.store(true, Ordering::SeqCst);
        assert!(engine
            .continue_turn("u1", Some("Show answer"), h.now, &mut stack)
            .is_err());
        let entry = h.progress.get_entry("u1", card.id).unwrap().unwrap();
        assert_eq!(entry.show_count, 0);

        catalog.cards_offline.store(false, Ordering::SeqCst);
        let mut stack = before;
        let texts = engine
            .continue_turn("u1", Some("Show answer"), h.now, &mut stack)
            .unwrap();
        assert_eq!(texts[0].text, "Paris");
        let entry = h.progress.get_entry("u1", card.id).unwrap().unwrap();
        assert_eq!(entry.show_count, 1);
    }

    #[test]
    fn test_drop_without_topic() {
        let mut h = Harness::new();
        with_deck(&h);
        h.send("hi");

        let texts = h.send("drop");
        assert_eq!(texts[0], "You have no topic in progress.");
        assert_eq!(h.top(), DialogId::ChooseTopic);
        assert_eq!(h.stack.len(), 1);
    }

    #[test]
    fn test_quiz_without_card_is_configuration_error() {
        let h = Harness::new();
        let mut stack = vec![DialogFrame::new(DialogId::Quiz, DialogOptions::default())];
        let err = h
            .engine
            .continue_turn("u1", Some("hi"), h.now, &mut stack)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_transition_bound() {
        let h = Harness::new();
        let engine = DialogEngine::new(h.catalog.clone(), h.progress.clone()).with_max_transitions(0);
        let mut stack = Vec::new();
        let err = engine.continue_turn("u1", Some("hi"), h.now, &mut stack).unwrap_err();
        assert!(matches!(err, RecallError::Internal(_)));
    }

    #[test]
    fn test_quiz_child_reports_to_parent() {
        let mut h = Harness::new();
        let deck = h.catalog.insert_deck("Capitals").unwrap();
        let card = h.catalog.insert_card(deck.id, "France", "Paris", None).unwrap();
        let q = h
            .catalog
            .insert_question(card.id, "Capital of France?", QuestionKind::FreeText, None, None)
            .unwrap();
        h.catalog.insert_answer(q.id, "Paris", None).unwrap();
        h.progress.enroll("u1", "Capitals", &[card.id], h.now).unwrap();
        h.progress.modify_entry("u1", card.id, &mut |e| e.easy_count = 1).unwrap();

        h.stack = vec![DialogFrame::new(DialogId::InitialLearning, DialogOptions::default())];
        let texts = h
            .engine
            .continue_turn("u1", None, h.now, &mut h.stack)
            .unwrap();
        assert_eq!(texts.last().unwrap().text, "Capital of France?");
        assert_eq!(h.top(), DialogId::Quiz);
        assert_eq!(h.stack[0].waiting, Some(Waiting::Child));

        let texts = h.send("paris");
        assert_eq!(texts[0], "Correct!");
        let entry = h.progress.get_entry("u1", card.id).unwrap().unwrap();
        assert_eq!(entry.easy_count, 2);
        assert_eq!(entry.show_count, 1);
    }
}
