//! Single-question quiz on a card the learner already knows.

use tracing::debug;

use super::required;
use crate::dialog::engine::{StepContext, StepFn};
use crate::dialog::types::{DialogResult, InputRequest, StepInput, StepOutcome};
use crate::error::RecallResult;
use crate::types::{Button, OutboundMessage, QuestionKind};

pub(super) const STEPS: &[StepFn] = &[ask_question, check_answer];

fn ask_question(ctx: &mut StepContext<'_>, _input: StepInput) -> RecallResult<StepOutcome> {
    let card_id = required(ctx.options.card_id, "the quiz card")?;
    let services = ctx.services;
    let selector = &services.selector;

    let question = match selector.next_question(ctx.user_id, card_id) {
        Ok(question) => question,
        Err(e) if e.is_not_found() => {
            debug!(card_id, "Card has no questions, skipping quiz");
            return Ok(StepOutcome::EndDialog(DialogResult::Skipped));
        }
        Err(e) => return Err(e),
    };
    selector.mark_shown(ctx.user_id, card_id, question.id)?;
    ctx.values.question_id = Some(question.id);

    let message = OutboundMessage::text(question.text.clone())
        .with_image(question.image_url.clone())
        .with_audio(question.audio_url.clone());

    let request = match question.kind {
        QuestionKind::FreeText => InputRequest::text(message),
        QuestionKind::ButtonChoice => {
            let mut message = message;
            message.buttons = selector
                .answer_choices(&question)?
                .into_iter()
                .map(|answer| Button::new(answer.text))
                .collect();
            InputRequest::choice_message(message)
        }
    };
    Ok(StepOutcome::prompt(request))
}

fn check_answer(ctx: &mut StepContext<'_>, input: StepInput) -> RecallResult<StepOutcome> {
    let question_id = required(ctx.values.question_id, "the asked question")?;
    let answer = required(input.reply(), "the answer")?;
    let services = ctx.services;

    let Some(question) = services.catalog.get_question(question_id)? else {
        return Ok(StepOutcome::EndDialog(DialogResult::Skipped));
    };

    if services.selector.check_answer(answer, &question)? {
        ctx.say("Correct!");
        return Ok(StepOutcome::EndDialog(DialogResult::Correct));
    }

    ctx.say("Not correct.");
    if services.selector.correct_answer_differs_from_card_back(&question)? {
        if let Some(correct) = services.selector.correct_answer(&question)? {
            ctx.say(format!("Correct answer is: {}", correct));
        }
    }
    Ok(StepOutcome::EndDialog(DialogResult::Incorrect))
}
