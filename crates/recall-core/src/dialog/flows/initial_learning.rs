//! Card walk-through: show front, reveal back, self-grade, repeat.
//!
//! Cards already graded easy at least once are quizzed instead when they
//! have questions.

use super::required;
use crate::dialog::engine::{StepContext, StepFn};
use crate::dialog::types::{
    DialogId, DialogOptions, DialogResult, InputRequest, StepInput, StepOutcome,
};
use crate::error::RecallResult;
use crate::types::{OutboundMessage, Outcome};

pub(super) const STEPS: &[StepFn] = &[show_card, show_answer, grade_card];

const SHOW_ANSWER: &str = "Show answer";
const EASY: &str = "Easy";
const HARD: &str = "Hard";
const LEARNED_ALL: &str = "Yay! You have learned all cards in this topic.";

fn show_card(ctx: &mut StepContext<'_>, _input: StepInput) -> RecallResult<StepOutcome> {
    let Some(due) = ctx.services.scheduler.next_due_card(ctx.user_id, ctx.now)? else {
        return Ok(StepOutcome::replace(DialogId::ChooseTopic));
    };
    ctx.values.card_id = Some(due.card.id);

    if due.entry.easy_count > 0 && ctx.services.selector.has_question(due.card.id)? {
        return Ok(StepOutcome::BeginChildDialog(
            DialogId::Quiz,
            DialogOptions::with_card(Some(due.card.id)),
        ));
    }

    Ok(StepOutcome::prompt(InputRequest::choice(
        due.card.front,
        [SHOW_ANSWER],
    )))
}

fn show_answer(ctx: &mut StepContext<'_>, input: StepInput) -> RecallResult<StepOutcome> {
    let card_id = required(ctx.values.card_id, "the current card")?;
    let services = ctx.services;
    let scheduler = &services.scheduler;

    if let StepInput::Child(result) = input {
        scheduler.record_shown(ctx.user_id, card_id, ctx.now)?;
        let outcome = match result {
            DialogResult::Correct => Some(Outcome::Easy),
            DialogResult::Incorrect => Some(Outcome::Hard),
            DialogResult::Skipped | DialogResult::None => None,
        };
        if let Some(outcome) = outcome {
            scheduler.record_outcome(ctx.user_id, card_id, outcome, ctx.now)?;
        }
        return next_card(ctx);
    }

    let Some(card) = services.catalog.get_card(card_id)? else {
        return next_card(ctx);
    };
    // Counted only once the card could be read.
    scheduler.record_shown(ctx.user_id, card_id, ctx.now)?;

    ctx.send(OutboundMessage::text(card.back).with_image(card.media_url));
    Ok(StepOutcome::prompt(InputRequest::choice(
        "Please choose if this card was easy or hard.",
        [EASY, HARD],
    )))
}

fn grade_card(ctx: &mut StepContext<'_>, input: StepInput) -> RecallResult<StepOutcome> {
    let card_id = required(ctx.values.card_id, "the current card")?;
    let outcome = required(
        input.reply().and_then(|reply| reply.parse::<Outcome>().ok()),
        "the grade",
    )?;

    ctx.services
        .scheduler
        .record_outcome(ctx.user_id, card_id, outcome, ctx.now)?;
    next_card(ctx)
}

/// Loop while cards are due, otherwise go back to topic choice.
fn next_card(ctx: &mut StepContext<'_>) -> RecallResult<StepOutcome> {
    if ctx.services.scheduler.next_due_card(ctx.user_id, ctx.now)?.is_none() {
        ctx.say(LEARNED_ALL);
        return Ok(StepOutcome::replace(DialogId::ChooseTopic));
    }
    Ok(StepOutcome::replace(DialogId::InitialLearning))
}
