use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid report: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("migration failure: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> WorkflowError {
        WorkflowError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> WorkflowError {
        WorkflowError::NotFound(message.into())
    }
}
