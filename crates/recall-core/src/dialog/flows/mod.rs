//! Step tables for each dialog.

mod choose_topic;
mod initial_learning;
mod interruption;
mod quiz;

use crate::dialog::engine::StepFn;
use crate::dialog::types::DialogId;
use crate::error::{RecallError, RecallResult};

const YES: &str = "Yes";
const NO: &str = "No";

/// Steps of a dialog, in order.
pub(crate) fn steps(dialog: DialogId) -> &'static [StepFn] {
    match dialog {
        DialogId::ChooseTopic => choose_topic::STEPS,
        DialogId::InitialLearning => initial_learning::STEPS,
        DialogId::Quiz => quiz::STEPS,
        DialogId::InterruptionMenu => interruption::MENU_STEPS,
        DialogId::DropTopic => interruption::DROP_STEPS,
    }
}

/// A value the dialog cannot run without. Missing means the stack is unusable.
fn required<T>(value: Option<T>, what: &str) -> RecallResult<T> {
    value.ok_or_else(|| RecallError::configuration(format!("dialog state is missing {}", what)))
}
