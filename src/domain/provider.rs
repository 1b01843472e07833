use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DomainError, DomainResult, IssueProviderKey, YoutrackCfg};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderId(pub String);

impl ProviderId {
    pub fn generate() -> Self {
        ProviderId(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        ProviderId(s)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        ProviderId(s.to_string())
    }
}

/// Provider-specific connection settings, tagged by provider key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issueProviderKey", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderSettings {
    Youtrack(YoutrackCfg),
}

impl ProviderSettings {
    pub fn key(&self) -> IssueProviderKey {
        match self {
            ProviderSettings::Youtrack(_) => IssueProviderKey::Youtrack,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            ProviderSettings::Youtrack(cfg) => cfg.token.as_deref(),
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        match self {
            ProviderSettings::Youtrack(cfg) => cfg.token = token,
        }
    }
}

/// A configured connection to one issue tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueProvider {
    pub id: ProviderId,
    pub is_enabled: bool,
    #[serde(flatten)]
    pub settings: ProviderSettings,
    #[serde(default)]
    pub default_project_id: Option<String>,
    #[serde(default)]
    pub pinned_search: Option<String>,
    #[serde(default)]
    pub is_auto_poll: bool,
    #[serde(default)]
    pub is_auto_add_to_backlog: bool,
    #[serde(default)]
    pub is_integrated_add_task_bar: bool,
}

impl IssueProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            id: ProviderId::generate(),
            is_enabled: true,
            settings,
            default_project_id: None,
            pinned_search: None,
            is_auto_poll: true,
            is_auto_add_to_backlog: false,
            is_integrated_add_task_bar: true,
        }
    }

    /// Disabled YouTrack provider with an empty server.
    pub fn default_youtrack() -> Self {
        Self {
            is_enabled: false,
            ..Self::new(ProviderSettings::Youtrack(YoutrackCfg::default()))
        }
    }

    pub fn key(&self) -> IssueProviderKey {
        self.settings.key()
    }

    pub fn ensure_key(&self, expected: IssueProviderKey) -> DomainResult<()> {
        let actual = self.key();
        if actual != expected {
            return Err(DomainError::ProviderMismatch { expected, actual });
        }
        Ok(())
    }

    pub fn youtrack(&self) -> DomainResult<&YoutrackCfg> {
        match &self.settings {
            ProviderSettings::Youtrack(cfg) => Ok(cfg),
        }
    }
}
