use thiserror::Error;

/// Errors raised while collecting, storing and advising on a response.
///
/// The first four are input-level and recoverable by asking again. Storage
/// failures end the submission. Recommendation and export failures happen
/// after the response is durable and never undo it.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValueKind { field: String, reason: String },

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Field '{0}' does not apply to the current answers")]
    FieldNotActive(String),

    #[error("Response is incomplete, missing: {}", missing.join(", "))]
    IncompleteResponse { missing: Vec<String> },

    #[error("This session was already submitted as record #{0}")]
    AlreadySubmitted(i64),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Recommendation unavailable: {0}")]
    RecommendationUnavailable(String),

    #[error("Failed to export report: {0}")]
    ExportFailed(#[from] std::io::Error),
}

impl AssistantError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        AssistantError::InvalidValueKind {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors the user can fix by answering again.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AssistantError::InvalidValueKind { .. }
                | AssistantError::UnknownField(_)
                | AssistantError::FieldNotActive(_)
                | AssistantError::IncompleteResponse { .. }
        )
    }
}

impl From<rusqlite::Error> for AssistantError {
    fn from(err: rusqlite::Error) -> Self {
        AssistantError::StorageUnavailable(err.to_string())
    }
}

pub type AssistantResult<T> = std::result::Result<T, AssistantError>;
