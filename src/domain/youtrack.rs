use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection settings for a YouTrack instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutrackCfg {
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl YoutrackCfg {
    /// Server URL without trailing slashes, ready to have paths appended.
    pub fn base_url(&self) -> &str {
        self.server.trim_end_matches('/')
    }

    pub fn has_server(&self) -> bool {
        !self.server.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YoutrackUserReduced {
    pub id: Option<String>,
    pub login: Option<String>,
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl YoutrackUserReduced {
    pub fn display_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .or(self.name.as_deref())
            .or(self.login.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YoutrackUser {
    #[serde(flatten)]
    pub profile: YoutrackUserReduced,
    pub avatar_url: Option<String>,
    pub banned: Option<bool>,
    pub online: Option<bool>,
    pub guest: Option<bool>,
    pub jabber_account_name: Option<String>,
    pub ring_id: Option<String>,
    pub tags: Vec<YoutrackIssueTag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YoutrackIssueTag {
    pub id: String,
    pub name: String,
    pub untag_on_resolve: Option<bool>,
    pub owner: Option<YoutrackUserReduced>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YoutrackProject {
    pub id: Option<String>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub archived: Option<bool>,
}

/// A YouTrack issue. Search results only carry a subset of these fields,
/// so everything except the id is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutrackIssue {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_readable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_in_project: Option<u64>,
    /// Milliseconds since the epoch, as YouTrack reports timestamps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<YoutrackProject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<YoutrackUserReduced>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updater: Option<YoutrackUserReduced>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikified_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses_markdown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_draft: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<YoutrackIssueTag>,
}

impl YoutrackIssue {
    /// Summary, or a generic title built from the id when the issue has none.
    pub fn display_title(&self) -> String {
        match self.summary.as_deref() {
            Some(summary) if !summary.is_empty() => summary.to_string(),
            _ => format!("Youtrack issue {}", self.id),
        }
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated.and_then(DateTime::from_timestamp_millis)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}
