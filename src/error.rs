//! Structured error types for store and application operations.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidFieldValue,
    EmptyContent,
    UnchangedContent,

    // Not found errors
    TaskNotFound,
    EntryNotFound,

    // Clock protocol
    NotClockedIn,
    NothingToPause,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error carrying a code and a short user-facing message.
#[derive(Debug, Error, Serialize)]
#[error("{message}")]
pub struct CoreError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl CoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn task_not_found(task_id: i64) -> Self {
        Self::new(ErrorCode::TaskNotFound, format!("Task not found: {}", task_id))
    }

    pub fn entry_not_found(entry_id: i64) -> Self {
        Self::new(
            ErrorCode::EntryNotFound,
            format!("Timesheet entry not found: {}", entry_id),
        )
    }

    pub fn not_clocked_in() -> Self {
        Self::new(ErrorCode::NotClockedIn, "Not clocked in.")
    }

    pub fn nothing_to_pause() -> Self {
        Self::new(ErrorCode::NothingToPause, "Nothing to pause.")
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn empty_content(message: &str) -> Self {
        Self::new(ErrorCode::EmptyContent, message)
    }

    pub fn unchanged_content(message: &str) -> Self {
        Self::new(ErrorCode::UnchangedContent, message)
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    /// Outcomes reported to the user as-is rather than as a failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::EmptyContent
                | ErrorCode::UnchangedContent
                | ErrorCode::NotClockedIn
                | ErrorCode::NothingToPause
                | ErrorCode::InvalidFieldValue
        )
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<CoreError>() {
            Ok(core_err) => core_err,
            Err(err) => match err.downcast::<rusqlite::Error>() {
                Ok(db_err) => CoreError::database(db_err),
                Err(err) => CoreError::internal(format!("{:#}", err)),
            },
        }
    }
}

/// Result type for application operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// The error code behind an `anyhow` error, if it carries one.
pub fn error_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.downcast_ref::<CoreError>().map(|e| e.code)
}
