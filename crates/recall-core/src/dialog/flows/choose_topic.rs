//! Topic selection: list new topics, confirm, enroll.

use tracing::info;

use super::{required, NO, YES};
use crate::dialog::engine::{StepContext, StepFn};
use crate::dialog::types::{DialogId, InputRequest, StepInput, StepOutcome};
use crate::error::RecallResult;

pub(super) const STEPS: &[StepFn] = &[list_topics, confirm_topic, enroll_topic];

const NO_NEW_TOPICS: &str =
    "There are no new topics for you right now. Come back later to review your cards.";

fn list_topics(ctx: &mut StepContext<'_>, _input: StepInput) -> RecallResult<StepOutcome> {
    let services = ctx.services;
    let enrolled = services.progress.enrolled_topics(ctx.user_id)?;
    let mut titles = Vec::new();
    for deck in services.catalog.list_decks()? {
        // Decks without cards cannot be enrolled in.
        if enrolled.contains(&deck.title) || services.catalog.cards_for_deck(deck.id)?.is_empty() {
            continue;
        }
        titles.push(deck.title);
    }

    if titles.is_empty() {
        if services.scheduler.next_due_card(ctx.user_id, ctx.now)?.is_some() {
            return Ok(StepOutcome::replace(DialogId::InitialLearning));
        }
        ctx.say(NO_NEW_TOPICS);
        return Ok(StepOutcome::EndDialog(Default::default()));
    }

    Ok(StepOutcome::prompt(InputRequest::choice(
        "I have these topics for you to learn. Please choose one:",
        titles,
    )))
}

fn confirm_topic(ctx: &mut StepContext<'_>, input: StepInput) -> RecallResult<StepOutcome> {
    let title = required(input.reply(), "the chosen topic")?;

    let Some(deck) = ctx.services.catalog.find_deck_by_title(title)? else {
        ctx.say("Sorry, this topic is no longer available.");
        return Ok(StepOutcome::replace(DialogId::ChooseTopic));
    };

    let question = format!("Do you want to start learning {}?", deck.title);
    ctx.values.deck_id = Some(deck.id);
    Ok(StepOutcome::prompt(InputRequest::choice(question, [YES, NO])))
}

fn enroll_topic(ctx: &mut StepContext<'_>, input: StepInput) -> RecallResult<StepOutcome> {
    if input.reply() != Some(YES) {
        return Ok(StepOutcome::replace(DialogId::ChooseTopic));
    }

    let deck_id = required(ctx.values.deck_id, "the chosen deck")?;
    let Some(deck) = ctx.services.catalog.get_deck(deck_id)? else {
        ctx.say("Sorry, this topic is no longer available.");
        return Ok(StepOutcome::replace(DialogId::ChooseTopic));
    };

    if ctx.services.catalog.cards_for_deck(deck.id)?.is_empty() {
        ctx.say(format!("Sorry, {} has no cards yet.", deck.title));
        return Ok(StepOutcome::replace(DialogId::ChooseTopic));
    }

    let created = ctx.services.scheduler.enroll_deck(ctx.user_id, &deck, ctx.now)?;
    info!(user_id = ctx.user_id, deck = %deck.title, created, "User started a topic");

    ctx.say(format!("Great! Let's start learning {}.", deck.title));
    Ok(StepOutcome::replace(DialogId::InitialLearning))
}
