use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenError {
    /// Malformed or missing required transaction fields. Rejected before
    /// screening; never produces a case.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Reference store unreachable or inconsistent during a lookup.
    /// Screening fails closed on this; it is never converted into a
    /// "pass" verdict.
    #[error("reference data unavailable: {0}")]
    ReferenceData(String),

    #[error("invalid status '{value}' for case {case_number}")]
    InvalidStatusTransition { case_number: String, value: String },

    /// Lock or write contention on a profile or case. The whole
    /// screen-and-record operation is safe to retry.
    #[error("concurrent write conflict: {0}")]
    ConcurrencyConflict(String),

    /// Generated case number already exists. Fatal: retrying here could
    /// silently duplicate a case.
    #[error("case number collision: {0}")]
    CaseNumberCollision(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScreenError {
    /// Whether the pipeline may retry the whole screen-and-record
    /// operation for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScreenError::ReferenceData(_) | ScreenError::ConcurrencyConflict(_)
        )
    }
}

pub type ScreenResult<T> = Result<T, ScreenError>;
