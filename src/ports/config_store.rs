use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{DomainError, IssueProvider, IssueProviderKey, ProviderId};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    ReadError(String),

    #[error("Failed to write configuration: {0}")]
    WriteError(String),

    #[error("Invalid configuration format: {0}")]
    InvalidFormat(String),

    #[error("Issue provider not found: {0}")]
    ProviderNotFound(ProviderId),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub request_timeout_secs: u64,
    pub initial_poll_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            initial_poll_delay_ms: 5_000,
        }
    }
}

/// Persistent issue provider configuration, keyed by provider id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    async fn load_config(&self) -> ConfigResult<AppConfig>;
    async fn save_config(&self, config: &AppConfig) -> ConfigResult<()>;

    /// Providers with their tokens filled in.
    async fn list_providers(&self) -> ConfigResult<Vec<IssueProvider>>;
    async fn get_provider(&self, id: &ProviderId) -> ConfigResult<Option<IssueProvider>>;
    async fn save_provider(&self, provider: &IssueProvider) -> ConfigResult<()>;
    async fn remove_provider(&self, id: &ProviderId) -> ConfigResult<()>;

    async fn get_token(&self, id: &ProviderId) -> ConfigResult<Option<String>>;
    async fn set_token(&self, id: &ProviderId, token: &str) -> ConfigResult<()>;
}

/// Fetch a provider's configuration and check it belongs to `key`.
pub async fn get_cfg_once<S>(
    store: &S,
    id: &ProviderId,
    key: IssueProviderKey,
) -> ConfigResult<IssueProvider>
where
    S: ProviderConfigStore + ?Sized,
{
    let provider = store
        .get_provider(id)
        .await?
        .ok_or_else(|| ConfigError::ProviderNotFound(id.clone()))?;
    provider.ensure_key(key)?;
    Ok(provider)
}
