use thiserror::Error;

/// Errors surfaced by the kcal core.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A payload was structurally wrong (e.g. not a JSON object).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A SQLite transaction failed. Never retried by the core.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The external estimator failed or returned something unusable.
    #[error("Estimator error: {0}")]
    Estimator(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
