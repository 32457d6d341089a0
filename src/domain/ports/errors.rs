use thiserror::Error;

/// Key-value store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Version conflict on {key}: expected {expected}")]
    VersionConflict { key: String, expected: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed store response: {0}")]
    MalformedResponse(String),
}

impl StoreError {
    /// Returns true if the operation may succeed when repeated unchanged
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Scheduler API errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed scheduler response: {0}")]
    MalformedResponse(String),

    #[error("Invalid unit {unit}: {reason}")]
    InvalidUnit { unit: String, reason: String },
}

impl SchedulerError {
    /// Returns true if the operation may succeed when repeated unchanged
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}
