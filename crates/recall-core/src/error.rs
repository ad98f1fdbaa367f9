//! Error types for recall operations.
//!
//! Errors carry a structured [`ErrorCode`] so callers (the turn controller and
//! the HTTP layer) can decide how to recover without matching on messages.

use thiserror::Error;

/// Result type alias for recall operations.
pub type RecallResult<T> = Result<T, RecallError>;

/// Main error type for all recall operations.
#[derive(Error, Debug)]
pub enum RecallError {
    /// A dialog step was started without the options it needs, or the
    /// service was wired up incorrectly. Fatal to the current turn.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A deck, card, question or user no longer exists.
    #[error("Not found: {message}")]
    NotFound { message: String, code: ErrorCode },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// Store unavailable or a write failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Stored or imported data could not be parsed.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration (CFG_xxx)
    CfgInvalid,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,

    // Not found (NF_xxx)
    NfDeck,
    NfCard,
    NfQuestion,
    NfUser,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Parse (PARSE_xxx)
    ParseInvalidData,
    ParseInvalidTimestamp,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::NfDeck => "NF_001",
            ErrorCode::NfCard => "NF_002",
            ErrorCode::NfQuestion => "NF_003",
            ErrorCode::NfUser => "NF_004",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::ParseInvalidData => "PARSE_001",
            ErrorCode::ParseInvalidTimestamp => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl RecallError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a not found error for a deck.
    pub fn deck_not_found(deck: impl std::fmt::Display) -> Self {
        Self::NotFound {
            message: format!("Deck '{}' not found", deck),
            code: ErrorCode::NfDeck,
        }
    }

    /// Create a not found error for a card.
    pub fn card_not_found(card_id: i64) -> Self {
        Self::NotFound {
            message: format!("Card {} not found", card_id),
            code: ErrorCode::NfCard,
        }
    }

    /// Create a not found error for a question.
    pub fn question_not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: ErrorCode::NfQuestion,
        }
    }

    /// Create a not found error for a user.
    pub fn user_not_found(user_id: &str) -> Self {
        Self::NotFound {
            message: format!("User '{}' not found", user_id),
            code: ErrorCode::NfUser,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidData,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::NotFound { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error should reset the conversation instead of leaving
    /// the pre-turn dialog stack in place.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Whether stored data exists but can no longer be decoded.
    pub fn is_unreadable_data(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Serialization(_))
    }

    /// Whether this error means the referenced entity is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotFound { .. } => Some("Please check the id and ensure it exists"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Database { .. } => Some("Please check the database path and permissions"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RecallError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = RecallError::validation("Invalid input");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_not_found_error() {
        let err = RecallError::card_not_found(42);
        assert_eq!(err.code(), ErrorCode::NfCard);
        assert!(err.is_not_found());
        assert!(err.suggestion().is_some());
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_configuration_error_is_flagged() {
        let err = RecallError::configuration("quiz started without a card");
        assert!(err.is_configuration());
        assert!(!RecallError::internal("boom").is_configuration());
    }

    #[test]
    fn test_unreadable_data() {
        let decode = serde_json::from_str::<u32>("not a number").unwrap_err();
        assert!(RecallError::from(decode).is_unreadable_data());
        assert!(RecallError::parse("bad timestamp").is_unreadable_data());
        assert!(!RecallError::database("locked").is_unreadable_data());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::CfgInvalid.as_str(), "CFG_001");
        assert_eq!(ErrorCode::NfCard.as_str(), "NF_002");
    }
}
