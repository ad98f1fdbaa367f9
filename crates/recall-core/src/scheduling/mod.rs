//! Card scheduling: which card to show next and when it is eligible again.

mod scheduler;

pub use scheduler::{
    apply_outcome, apply_shown, due_in_order, interval_days, select_next_due, DueCard, Scheduler,
};
