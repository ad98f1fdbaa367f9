//! Quiz questions: selection cycles and grading.

mod selector;

pub use selector::QuestionSelector;
