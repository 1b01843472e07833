use crate::{
    domain::{IssueProvider, IssueProviderKey, ProviderId},
    ports::{AppConfig, ConfigError, ConfigResult, ProviderConfigStore},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const APP_DIR: &str = "issue-bridge";
const YOUTRACK_TOKEN_ENV: &str = "YOUTRACK_TOKEN";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    request_timeout_secs: Option<u64>,
    initial_poll_delay_ms: Option<u64>,
    #[serde(default)]
    providers: Vec<IssueProvider>,
}

/// Provider configuration in a JSON file. Tokens never land in that file:
/// they go to the OS keyring, or a 0600 file next to the config when no
/// keyring is available.
pub struct FileProviderStore {
    config_path: PathBuf,
    keyring_service: Option<String>,
    write_lock: Mutex<()>,
}

impl FileProviderStore {
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::ReadError("Cannot determine config directory".to_string())
        })?;

        Ok(Self {
            config_path: config_dir.join(APP_DIR).join("config.json"),
            keyring_service: Some(APP_DIR.to_string()),
            write_lock: Mutex::new(()),
        })
    }

    /// Store rooted at `dir`, with file-only token storage.
    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: dir.as_ref().join("config.json"),
            keyring_service: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn token_file_path(&self, id: &ProviderId) -> PathBuf {
        self.config_dir()
            .join("tokens")
            .join(urlencoding::encode(&id.0).as_ref())
    }

    fn keyring_entry(&self, id: &ProviderId) -> Option<keyring::Entry> {
        let service = self.keyring_service.as_deref()?;
        match keyring::Entry::new(service, &format!("token:{}", id)) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Keyring service not available, falling back to file storage: {}", e);
                None
            }
        }
    }

    /// Read the token back through a fresh entry. Non-persistent backends
    /// (the keyring mock store) hand out a new credential per entry.
    fn keyring_holds(&self, id: &ProviderId, token: &str) -> bool {
        self.keyring_entry(id)
            .and_then(|entry| entry.get_password().ok())
            .is_some_and(|stored| stored == token)
    }

    async fn read_file(&self) -> ConfigResult<ConfigFile> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConfigFile::default());
            }
            Err(e) => return Err(ConfigError::ReadError(e.to_string())),
        };

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    async fn write_file(&self, config_file: &ConfigFile) -> ConfigResult<()> {
        fs::create_dir_all(self.config_dir())
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        let content = serde_json::to_string_pretty(config_file)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    async fn get_token_from_file(&self, id: &ProviderId) -> Option<String> {
        fs::read_to_string(self.token_file_path(id))
            .await
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    async fn set_token_in_file(&self, id: &ProviderId, token: &str) -> ConfigResult<()> {
        let token_path = self.token_file_path(id);
        if let Some(parent) = token_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }
        fs::write(&token_path, token)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&token_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        Ok(())
    }

    async fn with_token(&self, mut provider: IssueProvider) -> ConfigResult<IssueProvider> {
        let mut token = self.get_token(&provider.id).await?;
        if token.is_none() && provider.key() == IssueProviderKey::Youtrack {
            token = std::env::var(YOUTRACK_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        }
        provider.settings.set_token(token);
        Ok(provider)
    }
}

#[async_trait]
impl ProviderConfigStore for FileProviderStore {
    async fn load_config(&self) -> ConfigResult<AppConfig> {
        let config_file = self.read_file().await?;
        let defaults = AppConfig::default();

        Ok(AppConfig {
            request_timeout_secs: config_file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            initial_poll_delay_ms: config_file
                .initial_poll_delay_ms
                .unwrap_or(defaults.initial_poll_delay_ms),
        })
    }

    async fn save_config(&self, config: &AppConfig) -> ConfigResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut config_file = self.read_file().await?;
        config_file.request_timeout_secs = Some(config.request_timeout_secs);
        config_file.initial_poll_delay_ms = Some(config.initial_poll_delay_ms);
        self.write_file(&config_file).await
    }

    async fn list_providers(&self) -> ConfigResult<Vec<IssueProvider>> {
        let config_file = self.read_file().await?;
        let mut providers = Vec::with_capacity(config_file.providers.len());
        for provider in config_file.providers {
            providers.push(self.with_token(provider).await?);
        }
        Ok(providers)
    }

    async fn get_provider(&self, id: &ProviderId) -> ConfigResult<Option<IssueProvider>> {
        let config_file = self.read_file().await?;
        match config_file.providers.into_iter().find(|p| &p.id == id) {
            Some(provider) => Ok(Some(self.with_token(provider).await?)),
            None => Ok(None),
        }
    }

    async fn save_provider(&self, provider: &IssueProvider) -> ConfigResult<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(token) = provider.settings.token() {
            self.set_token(&provider.id, token).await?;
        }

        let mut stored = provider.clone();
        stored.settings.set_token(None);

        let mut config_file = self.read_file().await?;
        match config_file.providers.iter_mut().find(|p| p.id == stored.id) {
            Some(existing) => *existing = stored,
            None => config_file.providers.push(stored),
        }

        self.write_file(&config_file).await?;
        tracing::info!(provider = %provider.id, key = %provider.key(), "Saved issue provider");
        Ok(())
    }

    async fn remove_provider(&self, id: &ProviderId) -> ConfigResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut config_file = self.read_file().await?;
        let before = config_file.providers.len();
        config_file.providers.retain(|p| &p.id != id);
        if config_file.providers.len() == before {
            return Err(ConfigError::ProviderNotFound(id.clone()));
        }
        self.write_file(&config_file).await?;

        if let Some(entry) = self.keyring_entry(id) {
            if let Err(e) = entry.delete_credential() {
                tracing::debug!("No keyring token removed for {}: {}", id, e);
            }
        }
        let _ = fs::remove_file(self.token_file_path(id)).await;

        Ok(())
    }

    async fn get_token(&self, id: &ProviderId) -> ConfigResult<Option<String>> {
        if let Some(entry) = self.keyring_entry(id) {
            match entry.get_password() {
                Ok(token) => return Ok(Some(token)),
                Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    tracing::warn!("Keyring not available, falling back to file storage: {}", e);
                }
            }
        }

        Ok(self.get_token_from_file(id).await)
    }

    async fn set_token(&self, id: &ProviderId, token: &str) -> ConfigResult<()> {
        if let Some(entry) = self.keyring_entry(id) {
            match entry.set_password(token) {
                Ok(()) if self.keyring_holds(id, token) => return Ok(()),
                Ok(()) => {
                    tracing::warn!("Keyring did not keep the token, falling back to file storage");
                }
                Err(e) => {
                    tracing::warn!("Failed to store in keyring, falling back to file storage: {}", e);
                }
            }
        }

        self.set_token_in_file(id, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderSettings, YoutrackCfg};
    use crate::ports::get_cfg_once;

    fn youtrack(server: &str, token: Option<&str>) -> IssueProvider {
        IssueProvider::new(ProviderSettings::Youtrack(YoutrackCfg {
            server: server.to_string(),
            token: token.map(str::to_string),
        }))
    }

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProviderStore::at(dir.path());

        assert_eq!(store.load_config().await.unwrap(), AppConfig::default());
        assert!(store.list_providers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keeps_tokens_out_of_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProviderStore::at(dir.path());
        let provider = youtrack("https://yt.example.com", Some("perm:secret"));

        store.save_provider(&provider).await.unwrap();

        let raw = std::fs::read_to_string(store.config_path()).unwrap();
        assert!(!raw.contains("perm:secret"));
        assert!(raw.contains("https://yt.example.com"));

        let loaded = store.get_provider(&provider.id).await.unwrap().unwrap();
        assert_eq!(loaded, provider);
    }

    #[tokio::test]
    async fn replaces_existing_provider() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProviderStore::at(dir.path());
        let mut provider = youtrack("https://old.example.com", None);
        store.save_provider(&provider).await.unwrap();

        provider.settings = ProviderSettings::Youtrack(YoutrackCfg {
            server: "https://new.example.com".to_string(),
            token: None,
        });
        store.save_provider(&provider).await.unwrap();

        let providers = store.list_providers().await.unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(
            providers[0].youtrack().unwrap().server,
            "https://new.example.com"
        );
    }

    #[tokio::test]
    async fn removes_provider_and_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProviderStore::at(dir.path());
        let provider = youtrack("https://yt.example.com", Some("perm:secret"));
        store.save_provider(&provider).await.unwrap();

        store.remove_provider(&provider.id).await.unwrap();

        assert!(store.get_provider(&provider.id).await.unwrap().is_none());
        assert!(!store.token_file_path(&provider.id).exists());
        assert!(matches!(
            store.remove_provider(&provider.id).await,
            Err(ConfigError::ProviderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn cfg_lookup_checks_provider_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProviderStore::at(dir.path());
        let provider = youtrack("https://yt.example.com", None);
        store.save_provider(&provider).await.unwrap();

        assert!(get_cfg_once(&store, &provider.id, IssueProviderKey::Youtrack)
            .await
            .is_ok());
        assert!(matches!(
            get_cfg_once(&store, &provider.id, IssueProviderKey::Github).await,
            Err(ConfigError::Domain(_))
        ));
        assert!(matches!(
            get_cfg_once(&store, &ProviderId::from("missing"), IssueProviderKey::Youtrack).await,
            Err(ConfigError::ProviderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn token_survives_a_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let keyring_store = |dir: &Path| FileProviderStore {
            keyring_service: Some("issue-bridge-test".to_string()),
            ..FileProviderStore::at(dir)
        };
        let provider = youtrack("https://yt.example.com", Some("perm:secret"));

        keyring_store(dir.path()).save_provider(&provider).await.unwrap();

        let reloaded = keyring_store(dir.path());
        let loaded = reloaded.get_provider(&provider.id).await.unwrap().unwrap();
        assert_eq!(loaded.settings.token(), Some("perm:secret"));

        reloaded.remove_provider(&provider.id).await.unwrap();
    }

    #[tokio::test]
    async fn persists_app_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProviderStore::at(dir.path());
        let config = AppConfig {
            request_timeout_secs: 10,
            initial_poll_delay_ms: 100,
        };

        store.save_config(&config).await.unwrap();

        assert_eq!(store.load_config().await.unwrap(), config);
    }
}
