use thiserror::Error;

/// Errors that can occur while loading and scheduling echo jobs.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron expression failed to parse.
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// Reading the guild's job list failed.
    #[error("Store error: {0}")]
    Store(#[from] herald_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
