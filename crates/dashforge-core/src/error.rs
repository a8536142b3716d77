//! Core error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Target expression is empty")]
    EmptyExpression,

    #[error("Recording rule name is empty")]
    EmptyRuleName,

    #[error("Duplicate target refId '{ref_id}' in panel '{panel}'")]
    DuplicateRefId { panel: String, ref_id: String },

    #[error("Invalid panel span {0}: must be within 1..=12")]
    InvalidSpan(u8),

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Option only applies to {expected} panels, got {actual}")]
    WrongPanelKind {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Option only applies to {expected} variables, got {actual}")]
    WrongVariableKind {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Duplicate variable name: {0}")]
    DuplicateVariable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
