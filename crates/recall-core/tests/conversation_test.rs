//! Integration tests driving whole conversations through the turn controller.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use recall_core::{
    ConversationStore, InboundEvent, ProgressStore, QuestionKind, RecallConfig, RecallRuntime,
};

const WELCOME: &str = "Welcome to the tests!";

struct Chat {
    runtime: RecallRuntime,
    conversation_id: String,
    user_id: String,
    now: DateTime<Utc>,
}

impl Chat {
    fn new() -> Self {
        let config = RecallConfig::builder()
            .in_memory()
            .welcome_message(WELCOME)
            .build();
        Self {
            runtime: RecallRuntime::new(&config).unwrap(),
            conversation_id: "conv-1".to_string(),
            user_id: "user-1".to_string(),
            now: Utc::now().trunc_subsecs(0),
        }
    }

    async fn send(&self, event: InboundEvent) -> Vec<String> {
        let reply = self.runtime.turns.handle(&event.at(self.now)).await.unwrap();
        reply.messages.into_iter().map(|m| m.text).collect()
    }

    async fn say(&self, text: &str) -> Vec<String> {
        self.send(InboundEvent::text(&self.conversation_id, &self.user_id, text))
            .await
    }

    async fn press(&self, value: &str) -> Vec<String> {
        self.send(InboundEvent::text(&self.conversation_id, &self.user_id, "").with_button(value))
            .await
    }

    fn add_capitals(&self) {
        let catalog = &self.runtime.catalog;
        let deck = catalog.insert_deck("Capitals").unwrap();
        catalog.insert_card(deck.id, "France", "Paris", None).unwrap();
        catalog
            .insert_card(deck.id, "Spain", "Madrid", Some("https://img/madrid.png"))
            .unwrap();
    }

    fn add_rivers(&self) {
        let catalog = &self.runtime.catalog;
        let deck = catalog.insert_deck("Rivers").unwrap();
        catalog.insert_card(deck.id, "Egypt", "Nile", None).unwrap();
    }

    fn stack_depth(&self) -> usize {
        self.runtime
            .conversations
            .load_state(&self.conversation_id)
            .unwrap()
            .unwrap()
            .dialog_stack
            .len()
    }
}

#[tokio::test]
async fn test_two_card_topic_until_no_new_topics() {
    let chat = Chat::new();
    chat.add_capitals();

    let texts = chat.say("hi").await;
    assert_eq!(texts[0], WELCOME);
    assert!(texts[1].starts_with("I have these topics"));

    let texts = chat.say("capitals").await;
    assert_eq!(texts, vec!["Do you want to start learning Capitals?"]);

    let texts = chat.say("yes").await;
    assert_eq!(texts, vec!["Great! Let's start learning Capitals.", "France"]);

    let texts = chat.press("Show answer").await;
    assert_eq!(texts, vec!["Paris", "Please choose if this card was easy or hard."]);

    let texts = chat.say("Easy").await;
    assert_eq!(texts, vec!["Spain"]);

    let texts = chat.say("show answer").await;
    assert_eq!(texts[0], "Madrid");

    let texts = chat.say("easy").await;
    assert_eq!(texts[0], "Yay! You have learned all cards in this topic.");
    assert!(texts[1].contains("no new topics"));
    assert_eq!(chat.stack_depth(), 0);

    let entries = chat.runtime.progress.entries_for_user(&chat.user_id).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.easy_count == 1 && e.show_count == 1));
    assert!(entries
        .iter()
        .all(|e| e.show_after == chat.now + Duration::days(1)));
}

#[tokio::test]
async fn test_back_of_card_carries_media() {
    let chat = Chat::new();
    chat.add_capitals();
    chat.say("hi").await;
    chat.say("Capitals").await;
    chat.say("Yes").await;
    chat.say("Show answer").await;
    chat.say("Easy").await;

    let event = InboundEvent::text(&chat.conversation_id, &chat.user_id, "Show answer").at(chat.now);
    let reply = chat.runtime.turns.handle(&event).await.unwrap();
    assert_eq!(reply.messages[0].text, "Madrid");
    assert_eq!(
        reply.messages[0].image_url.as_deref(),
        Some("https://img/madrid.png")
    );
    assert_eq!(reply.messages[1].buttons.len(), 2);
}

#[tokio::test]
async fn test_hard_card_is_shown_again() {
    let chat = Chat::new();
    chat.add_capitals();
    chat.say("hi").await;
    chat.say("Capitals").await;
    chat.say("Yes").await;

    chat.say("Show answer").await;
    assert_eq!(chat.say("Hard").await, vec!["Spain"]);
    chat.say("Show answer").await;

    // France was shown first and is still eligible, so it comes back.
    let texts = chat.say("Easy").await;
    assert_eq!(texts, vec!["France"]);
}

#[tokio::test]
async fn test_returning_learner_reviews_due_cards() {
    let mut chat = Chat::new();
    chat.add_capitals();
    chat.say("hi").await;
    chat.say("Capitals").await;
    chat.say("Yes").await;
    for _ in 0..2 {
        chat.say("Show answer").await;
        chat.say("Easy").await;
    }
    assert_eq!(chat.stack_depth(), 0);

    chat.now = chat.now + Duration::days(2);
    let texts = chat.say("hello again").await;
    assert_eq!(texts, vec!["France"]);
}

#[tokio::test]
async fn test_quiz_on_learned_card() {
    let mut chat = Chat::new();
    let catalog = &chat.runtime.catalog;
    let deck = catalog.insert_deck("Capitals").unwrap();
    let card = catalog.insert_card(deck.id, "France", "Paris", None).unwrap();
    let q1 = catalog
        .insert_question(card.id, "What is the capital of France?", QuestionKind::FreeText, None, None)
        .unwrap();
    catalog.insert_answer(q1.id, "Paris", None).unwrap();
    let q2 = catalog
        .insert_question(
            card.id,
            "Which river flows through the capital of France?",
            QuestionKind::ButtonChoice,
            Some("https://img/paris.png"),
            None,
        )
        .unwrap();
    catalog.insert_answer(q2.id, "Seine", Some(true)).unwrap();
    catalog.insert_answer(q2.id, "Loire", Some(false)).unwrap();

    chat.say("hi").await;
    chat.say("Capitals").await;
    chat.say("Yes").await;
    chat.say("Show answer").await;
    chat.say("Easy").await;

    chat.now = chat.now + Duration::days(2);
    let texts = chat.say("hi").await;
    assert_eq!(texts, vec!["What is the capital of France?"]);

    // Answer equals the card back, so it is not revealed again.
    let texts = chat.say("Lyon").await;
    assert_eq!(texts[0], "Not correct.");
    assert_eq!(texts[1], "Which river flows through the capital of France?");

    let entry = chat.runtime.progress.get_entry(&chat.user_id, card.id).unwrap().unwrap();
    assert_eq!(entry.hard_count, 1);
    assert_eq!(entry.show_count, 2);

    // Button questions only accept their options.
    let texts = chat.say("Danube").await;
    assert_eq!(texts[0], "Please choose one of the options.");

    let texts = chat.say("loire").await;
    assert_eq!(
        &texts[..2],
        &["Not correct.".to_string(), "Correct answer is: Seine".to_string()]
    );

    // Both questions asked: the cycle starts over.
    assert_eq!(texts[2], "What is the capital of France?");
    let texts = chat.say(" PARIS ").await;
    assert_eq!(texts[0], "Correct!");

    let entry = chat.runtime.progress.get_entry(&chat.user_id, card.id).unwrap().unwrap();
    assert_eq!(entry.easy_count, 2);
    assert_eq!(entry.show_after, chat.now + Duration::days(6));
}

#[tokio::test]
async fn test_drop_topic_keeps_other_topics() {
    let chat = Chat::new();
    chat.add_capitals();
    chat.add_rivers();

    chat.say("hi").await;
    chat.say("Rivers").await;
    chat.say("Yes").await;
    chat.say("Show answer").await;
    let texts = chat.say("Hard").await;
    assert_eq!(texts, vec!["Egypt"]);

    chat.say("help").await;
    let texts = chat.say("Switch the topic").await;
    assert_eq!(texts[0], "I have these topics for you to learn. Please choose one:");
    chat.say("Capitals").await;

    // Capitals cards were never shown, so they go before the hard Rivers card.
    let texts = chat.say("Yes").await;
    assert_eq!(texts.last().unwrap(), "France");

    let texts = chat.say("drop").await;
    assert_eq!(
        texts,
        vec!["Do you really want to drop Capitals? Your progress in this topic will be lost."]
    );
    let texts = chat.say("Yes").await;
    assert_eq!(texts[0], "Topic Capitals dropped.");
    assert!(texts[1].starts_with("I have these topics"));

    let topics = chat.runtime.progress.enrolled_topics(&chat.user_id).unwrap();
    assert_eq!(topics, vec!["Rivers"]);
    let rivers = chat.runtime.progress.entries_for_user(&chat.user_id).unwrap();
    assert_eq!(rivers[0].hard_count, 1);
}

#[tokio::test]
async fn test_declined_drop_returns_to_card() {
    let chat = Chat::new();
    chat.add_capitals();
    chat.say("hi").await;
    chat.say("Capitals").await;
    chat.say("Yes").await;

    chat.say("drop").await;
    let texts = chat.say("No").await;
    assert_eq!(texts, vec!["France"]);
    assert_eq!(chat.runtime.progress.entries_for_user(&chat.user_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_progress_from_help_menu() {
    let chat = Chat::new();
    chat.add_capitals();
    chat.say("hi").await;
    chat.say("Capitals").await;
    chat.say("Yes").await;
    chat.say("Show answer").await;
    chat.say("Easy").await;

    let texts = chat.say("?").await;
    assert!(texts[0].starts_with("Here is what you can do with topics"));
    assert_eq!(texts[1], "Please choose one option:");

    let texts = chat.say("show my progress").await;
    assert!(texts[0].contains("Capitals: 2 cards"));
    assert!(texts[0].contains("50% learned"));
    assert_eq!(texts[1], "Spain");
    assert_eq!(chat.stack_depth(), 1);
}

#[tokio::test]
async fn test_cancel_then_restart() {
    let chat = Chat::new();
    chat.add_capitals();
    chat.say("hi").await;
    chat.say("Capitals").await;

    assert_eq!(chat.say("Quit").await, vec!["Cancelling."]);
    assert_eq!(chat.stack_depth(), 0);

    let texts = chat.say("hi").await;
    assert!(texts[0].starts_with("I have these topics"));
}
