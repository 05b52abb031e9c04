use thiserror::Error;

use alumlink_store::StoreError;

/// Input that failed validation; the caller must correct it and retry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message text is empty")]
    EmptyMessage,

    #[error("post content is empty")]
    EmptyContent,

    #[error("comment text is empty")]
    EmptyText,

    #[error("rating must be between 1 and 5 stars, got {0}")]
    InvalidRating(u8),

    #[error("cannot send a mentorship request to yourself")]
    SelfRequest,

    #[error("target profile is not an alumni mentor")]
    NotAMentor,
}

/// Errors surfaced by engine operations.
///
/// None of these is fatal to the process; every one is a per-call failure the
/// caller can recover from by correcting input, refreshing a stale view or
/// re-deciding whether to retry.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The acting identity lacks rights for the target entity.  Never
    /// retried automatically.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// A transition raced against the stored state and lost; re-fetch and
    /// re-decide.
    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A live subscription failed persistently and was terminated.
    #[error("subscription failed: {0}")]
    Subscription(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => EngineError::NotFound("record not found".to_string()),
            StoreError::AlreadyExists => {
                EngineError::StateConflict("record already exists".to_string())
            }
            other => EngineError::Store(other),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
