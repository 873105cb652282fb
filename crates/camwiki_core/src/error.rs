use thiserror::Error;

/// Failure taxonomy for store and workflow operations.
///
/// Store-level lookup misses are converted to `NotFound` at the workflow
/// boundary; raw `rusqlite` errors only pass through for genuine storage
/// faults. `Integrity` marks states the append-only contract should make
/// unreachable (a page row with zero revisions) and is logged rather than
/// recovered from.
#[derive(Debug, Error)]
pub enum WikiError {
    #[error("not found")]
    NotFound,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed for {field}: {message}")]
    ValidationFailed {
        field: &'static str,
        message: String,
    },

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error("system clock is before UNIX_EPOCH")]
    Clock(#[from] std::time::SystemTimeError),
}

impl WikiError {
    pub fn forbidden(reason: &str) -> Self {
        Self::Forbidden(reason.to_string())
    }

    pub fn validation(field: &'static str, message: &str) -> Self {
        Self::ValidationFailed {
            field,
            message: message.to_string(),
        }
    }
}
