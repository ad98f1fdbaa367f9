//! Dialog stack types. Everything here is persisted between turns.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::OutboundMessage;

/// The closed set of dialogs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DialogId {
    ChooseTopic,
    InitialLearning,
    Quiz,
    InterruptionMenu,
    DropTopic,
}

impl DialogId {
    /// The dialog begun on an empty stack.
    pub const ROOT: DialogId = DialogId::ChooseTopic;

    /// Side flows started by reserved commands.
    pub fn is_interruption(self) -> bool {
        matches!(self, DialogId::InterruptionMenu | DialogId::DropTopic)
    }
}

/// Arguments a dialog is begun with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<i64>,
}

impl DialogOptions {
    pub fn with_card(card_id: Option<i64>) -> Self {
        Self { card_id }
    }
}

/// Values a dialog keeps between its steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<i64>,
}

/// What kind of reply a prompt accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    /// One of the message's buttons, by label or value.
    Choice,
    /// Any non-empty text.
    Text,
}

/// A prompt sent to the learner. Kept on the frame so it can be re-sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequest {
    pub message: OutboundMessage,
    pub expect: Expect,
}

impl InputRequest {
    /// A prompt offering the given options as buttons.
    pub fn choice<I, S>(text: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: OutboundMessage::text(text).with_buttons(options),
            expect: Expect::Choice,
        }
    }

    /// A choice prompt with explicit buttons.
    pub fn choice_message(message: OutboundMessage) -> Self {
        Self {
            message,
            expect: Expect::Choice,
        }
    }

    /// A prompt accepting free text.
    pub fn text(message: OutboundMessage) -> Self {
        Self {
            message,
            expect: Expect::Text,
        }
    }

    /// Recognize a reply. Choices resolve to the matching button's value.
    pub fn recognize(&self, reply: Option<&str>) -> Option<String> {
        let reply = reply.map(str::trim).filter(|r| !r.is_empty())?;
        match self.expect {
            Expect::Text => Some(reply.to_string()),
            Expect::Choice => {
                let wanted = reply.to_lowercase();
                self.message
                    .buttons
                    .iter()
                    .find(|b| b.label.to_lowercase() == wanted || b.value.to_lowercase() == wanted)
                    .map(|b| b.value.clone())
            }
        }
    }

    /// Line sent before the prompt when a reply was not recognized.
    pub fn retry_text(&self) -> &'static str {
        match self.expect {
            Expect::Choice => "Please choose one of the options.",
            Expect::Text => "Please type your answer.",
        }
    }
}

/// What a suspended frame is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Waiting {
    Prompt { request: InputRequest },
    Child,
}

/// One entry of the dialog stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogFrame {
    pub dialog: DialogId,
    /// Index of the step to run next.
    pub step: usize,
    #[serde(default)]
    pub options: DialogOptions,
    #[serde(default)]
    pub values: FrameValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting: Option<Waiting>,
}

impl DialogFrame {
    pub fn new(dialog: DialogId, options: DialogOptions) -> Self {
        Self {
            dialog,
            step: 0,
            options,
            values: FrameValues::default(),
            waiting: None,
        }
    }

    /// The card this frame is working on, if any.
    pub fn card_id(&self) -> Option<i64> {
        self.values.card_id.or(self.options.card_id)
    }
}

/// Result a dialog ends with, handed to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogResult {
    #[default]
    None,
    Correct,
    Incorrect,
    /// A quiz that had nothing to ask.
    Skipped,
}

/// Input handed to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    None,
    /// A recognized prompt reply.
    Reply(String),
    /// The result of a child dialog.
    Child(DialogResult),
}

impl StepInput {
    pub fn reply(&self) -> Option<&str> {
        match self {
            StepInput::Reply(value) => Some(value),
            _ => None,
        }
    }
}

/// What a step asks the engine to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Advance. With a request, send it and wait for the reply; without, run
    /// the next step now.
    Continue(Option<InputRequest>),
    EndDialog(DialogResult),
    ReplaceDialog(DialogId, DialogOptions),
    BeginChildDialog(DialogId, DialogOptions),
    /// Clear the stack, then optionally begin a fresh root dialog.
    CancelAll(Option<DialogId>),
}

impl StepOutcome {
    pub fn prompt(request: InputRequest) -> Self {
        StepOutcome::Continue(Some(request))
    }

    pub fn next() -> Self {
        StepOutcome::Continue(None)
    }

    pub fn replace(dialog: DialogId) -> Self {
        StepOutcome::ReplaceDialog(dialog, DialogOptions::default())
    }
}

/// Persisted per-conversation state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub dialog_stack: Vec<DialogFrame>,
    #[serde(default)]
    pub welcomed: bool,
}
