//! Per-user progress: users, learning-matrix rows and shown-question marks.

mod store;

pub use store::{ProgressStore, SqliteProgressStore};
