//! Core types for recall.

mod catalog;
mod message;
mod progress;

pub use catalog::*;
pub use message::*;
pub use progress::*;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{ErrorCode, RecallError, RecallResult};

/// Format a timestamp for SQLite. Fixed width, so text order is time order.
pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp as stored in SQLite.
pub(crate) fn parse_timestamp(value: &str) -> RecallResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RecallError::Parse {
            message: format!("invalid timestamp '{}': {}", value, e),
            code: ErrorCode::ParseInvalidTimestamp,
        })
}
