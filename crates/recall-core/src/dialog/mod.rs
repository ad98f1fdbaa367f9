//! Conversation flow as a resumable stack of waterfall dialogs.
//!
//! Each dialog is an ordered list of steps. The stack is plain data, saved
//! after every turn and loaded before the next one.

mod engine;
mod flows;
mod types;

pub use engine::{
    DialogEngine, Interruption, Services, StepContext, StepFn, DEFAULT_MAX_TRANSITIONS,
};
pub use types::{
    ConversationState, DialogFrame, DialogId, DialogOptions, DialogResult, Expect, FrameValues,
    InputRequest, StepInput, StepOutcome, Waiting,
};
