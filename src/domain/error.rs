use thiserror::Error;

use super::IssueProviderKey;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Required field missing: {0}")]
    MissingField(String),

    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider is configured for {actual}, expected {expected}")]
    ProviderMismatch {
        expected: IssueProviderKey,
        actual: IssueProviderKey,
    },
}

pub type DomainResult<T> = Result<T, DomainError>;
