use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{IssueId, IssueProviderKey, YoutrackCfg, YoutrackIssue, YoutrackUser};
use crate::ports::{Notification, NotificationSink, ProviderError, ProviderResult};

const PROVIDER: IssueProviderKey = IssueProviderKey::Youtrack;

const ISSUE_FIELDS: &str = "id,idReadable,numberInProject,created,updated,resolved,summary,description,wikifiedDescription,usesMarkdown,isDraft,project(id,name,shortName),reporter(id,login,fullName,email),updater(id,login,fullName),tags(id,name)";
const SEARCH_FIELDS: &str = "id,idReadable,numberInProject,updated,resolved,summary,description,reporter(login,fullName)";
const USER_FIELDS: &str = "id,login,fullName,email,name,avatarUrl,banned,online,guest";
const SEARCH_LIMIT: &str = "50";

/// Error payload YouTrack sends with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YoutrackErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    name: Option<String>,
    #[serde(rename = "statusText")]
    status_text: Option<String>,
}

impl YoutrackErrorBody {
    fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error_description.as_deref())
            .filter(|m| !m.is_empty())
    }

    fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.status_text.as_deref())
            .or(self.error.as_deref())
    }
}

/// Message shown to the user for a failed YouTrack response.
pub(crate) fn error_notification_message(status: StatusCode, body: &str) -> String {
    let parsed: YoutrackErrorBody = serde_json::from_str(body).unwrap_or_default();

    if let Some(message) = parsed.message() {
        return format!("{}: {}", PROVIDER.humanized(), message);
    }

    let error_msg = parsed
        .name()
        .map(str::to_string)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Unknown error".to_string());

    format!(
        "{}: Unknown error ({}): {}",
        PROVIDER.humanized(),
        status.as_u16(),
        error_msg
    )
}

/// HTTP client for the YouTrack REST API. Every failure is reported to the
/// notification sink before it is returned.
pub struct YoutrackClient {
    client: Client,
    notifier: Arc<dyn NotificationSink>,
}

impl YoutrackClient {
    pub fn new(timeout: Duration, notifier: Arc<dyn NotificationSink>) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("issue-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::ClientSetup {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(Self { client, notifier })
    }

    pub async fn get_me(&self, cfg: &YoutrackCfg) -> ProviderResult<YoutrackUser> {
        self.send_request(cfg, "/api/users/me", &[("fields", USER_FIELDS)])
            .await
    }

    pub async fn get_by_id(
        &self,
        issue_id: &IssueId,
        cfg: &YoutrackCfg,
    ) -> ProviderResult<YoutrackIssue> {
        let path = format!("/api/issues/{}", urlencoding::encode(&issue_id.0));
        self.send_request(cfg, &path, &[("fields", ISSUE_FIELDS)])
            .await
    }

    pub async fn search_issue(
        &self,
        query: &str,
        cfg: &YoutrackCfg,
    ) -> ProviderResult<Vec<YoutrackIssue>> {
        self.send_request(
            cfg,
            "/api/issues",
            &[
                ("query", query),
                ("fields", SEARCH_FIELDS),
                ("$top", SEARCH_LIMIT),
            ],
        )
        .await
    }

    async fn send_request<T: DeserializeOwned>(
        &self,
        cfg: &YoutrackCfg,
        path: &str,
        query: &[(&str, &str)],
    ) -> ProviderResult<T> {
        self.check_settings(cfg)?;

        let url = format!("{}{}", cfg.base_url(), path);
        tracing::debug!(%url, "YouTrack request");

        let mut request = self
            .client
            .get(&url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = cfg.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.handle_network_error(e)),
        };

        self.handle_response(&url, response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        url: &str,
        response: Response,
    ) -> ProviderResult<T> {
        let status = response.status();

        if status.is_success() {
            let response_text = response
                .text()
                .await
                .map_err(|e| self.handle_network_error(e))?;

            tracing::debug!("YouTrack response: {}", response_text);

            return serde_json::from_str(&response_text).map_err(|e| {
                ProviderError::Serialization(format!(
                    "Failed to parse YouTrack response: {}. Response was: {}",
                    e, response_text
                ))
            });
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        let body = response.text().await.unwrap_or_default();

        let message = error_notification_message(status, &body);
        tracing::warn!(%url, status = status.as_u16(), "{}", message);
        self.notifier.notify(Notification::error(message));

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::Authentication(format!("Youtrack: HTTP {} for {}", status, url))
            }
            StatusCode::NOT_FOUND => {
                ProviderError::NotFound(format!("Youtrack: HTTP {} for {}", status, url))
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimit(retry_after),
            _ => ProviderError::Handled(format!("Youtrack: HTTP {} for {}", status, url)),
        })
    }

    fn handle_network_error(&self, error: reqwest::Error) -> ProviderError {
        tracing::warn!("YouTrack network error: {}", error);
        self.notifier.notify(Notification::error(format!(
            "{}: Request failed because of a client side network error",
            PROVIDER.humanized()
        )));
        ProviderError::Network {
            provider: PROVIDER,
            message: error.to_string(),
        }
    }

    fn check_settings(&self, cfg: &YoutrackCfg) -> ProviderResult<()> {
        if !cfg.has_server() {
            self.notifier.notify(Notification::error(format!(
                "{}: Not enough settings. Please configure the server first",
                PROVIDER.humanized()
            )));
            return Err(ProviderError::NotConfigured { provider: PROVIDER });
        }
        Ok(())
    }
}
