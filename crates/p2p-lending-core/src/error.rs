use thiserror::Error;

#[derive(Debug, Error)]
pub enum LendingError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cannot {action} loan {loan_id}: current status is {status}")]
    InvalidState {
        loan_id: u64,
        action: &'static str,
        status: String,
    },

    #[error("Agreement {agreement_id} is already signed")]
    AlreadySigned { agreement_id: u64 },

    #[error("Malformed agreement reference '{url}': {reason}")]
    ReferenceParse { url: String, reason: String },

    #[error("Document generation failed: {0}")]
    DocumentGeneration(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Coarse classification of a [`LendingError`], the way a transport layer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    InvalidState,
    Parse,
    Internal,
}

impl ErrorKind {
    /// Status code a surrounding HTTP layer answers with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::InvalidState | ErrorKind::Parse => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::Internal => 500,
        }
    }
}

impl LendingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LendingError::InvalidInput { .. } | LendingError::AlreadySigned { .. } => {
                ErrorKind::Validation
            }
            LendingError::NotFound { .. } => ErrorKind::NotFound,
            LendingError::Forbidden(_) => ErrorKind::Forbidden,
            LendingError::InvalidState { .. } => ErrorKind::InvalidState,
            LendingError::ReferenceParse { .. } => ErrorKind::Parse,
            LendingError::DocumentGeneration(_) | LendingError::SerializationError(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LendingError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LendingError {
    fn from(e: serde_json::Error) -> Self {
        LendingError::SerializationError(e.to_string())
    }
}
