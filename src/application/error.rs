use crate::domain::{IssueProviderKey, TaskId};
use crate::ports::{ConfigError, ProviderError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task store error: {0}")]
    Store(#[from] StoreError),

    #[error("No issue provider registered for {0}")]
    UnsupportedProvider(IssueProviderKey),

    #[error("Task {0} is not linked to an issue")]
    TaskNotLinked(TaskId),

    #[error("Application error: {0}")]
    Application(String),
}

impl AppError {
    /// Whether the user has already been notified about this failure.
    pub fn is_notified(&self) -> bool {
        matches!(
            self,
            AppError::Provider(
                ProviderError::Network { .. }
                    | ProviderError::NotConfigured { .. }
                    | ProviderError::Authentication(_)
                    | ProviderError::NotFound(_)
                    | ProviderError::RateLimit(_)
                    | ProviderError::Handled(_)
            )
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
