//! Side flows started by reserved commands: the help menu and topic drop.

use tracing::info;

use super::{NO, YES};
use crate::dialog::engine::{StepContext, StepFn};
use crate::dialog::types::{DialogId, InputRequest, StepInput, StepOutcome};
use crate::error::RecallResult;

pub(super) const MENU_STEPS: &[StepFn] = &[show_menu, handle_choice];
pub(super) const DROP_STEPS: &[StepFn] = &[confirm_drop, drop_topic];

const SHOW_PROGRESS: &str = "Show my progress";
const DROP_TOPIC: &str = "Drop the topic";
const SWITCH_TOPIC: &str = "Switch the topic";
const BACK_TO_TOPIC: &str = "<< Back to topic";

const HELP_TEXT: &str = "Here is what you can do with topics:\n\
    1. Show my progress lists the topics you are learning.\n\
    2. Drop the topic means you don't want to learn this topic anymore.\n\
    3. Switch the topic means you want to start learning a new topic and keep progress of the current topic as well.\n\
    4. Back to topic means you want to proceed learning the current topic.";

fn show_menu(ctx: &mut StepContext<'_>, _input: StepInput) -> RecallResult<StepOutcome> {
    ctx.say(HELP_TEXT);
    Ok(StepOutcome::prompt(InputRequest::choice(
        "Please choose one option:",
        [SHOW_PROGRESS, DROP_TOPIC, SWITCH_TOPIC, BACK_TO_TOPIC],
    )))
}

fn handle_choice(ctx: &mut StepContext<'_>, input: StepInput) -> RecallResult<StepOutcome> {
    match input.reply() {
        Some(SHOW_PROGRESS) => {
            let stats = ctx.services.progress.user_stats(ctx.user_id)?;
            ctx.say(stats.to_text());
            Ok(StepOutcome::EndDialog(Default::default()))
        }
        Some(DROP_TOPIC) => Ok(StepOutcome::ReplaceDialog(
            DialogId::DropTopic,
            ctx.options.clone(),
        )),
        Some(SWITCH_TOPIC) => Ok(StepOutcome::CancelAll(Some(DialogId::ChooseTopic))),
        _ => Ok(StepOutcome::EndDialog(Default::default())),
    }
}

fn confirm_drop(ctx: &mut StepContext<'_>, _input: StepInput) -> RecallResult<StepOutcome> {
    let topic = match ctx.options.card_id {
        Some(card_id) => ctx
            .services
            .progress
            .get_entry(ctx.user_id, card_id)?
            .map(|entry| entry.deck_title),
        None => None,
    };

    let Some(topic) = topic else {
        ctx.say("You have no topic in progress.");
        return Ok(StepOutcome::EndDialog(Default::default()));
    };

    let question = format!(
        "Do you really want to drop {}? Your progress in this topic will be lost.",
        topic
    );
    ctx.values.deck_title = Some(topic);
    Ok(StepOutcome::prompt(InputRequest::choice(question, [YES, NO])))
}

fn drop_topic(ctx: &mut StepContext<'_>, input: StepInput) -> RecallResult<StepOutcome> {
    let Some(topic) = ctx.values.deck_title.clone() else {
        return Ok(StepOutcome::EndDialog(Default::default()));
    };
    if input.reply() != Some(YES) {
        return Ok(StepOutcome::EndDialog(Default::default()));
    }

    let deleted = ctx.services.progress.drop_topic(ctx.user_id, &topic)?;
    info!(user_id = ctx.user_id, topic = %topic, deleted, "User dropped a topic");

    ctx.say(format!("Topic {} dropped.", topic));
    Ok(StepOutcome::CancelAll(Some(DialogId::ChooseTopic)))
}
