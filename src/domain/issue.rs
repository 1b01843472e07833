use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ProviderId, YoutrackIssue};

/// Every issue tracker the application knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueProviderKey {
    Jira,
    Github,
    Gitlab,
    Caldav,
    Ical,
    OpenProject,
    Gitea,
    Redmine,
    Youtrack,
}

impl IssueProviderKey {
    pub const ALL: [IssueProviderKey; 9] = [
        IssueProviderKey::Jira,
        IssueProviderKey::Github,
        IssueProviderKey::Gitlab,
        IssueProviderKey::Caldav,
        IssueProviderKey::Ical,
        IssueProviderKey::OpenProject,
        IssueProviderKey::Gitea,
        IssueProviderKey::Redmine,
        IssueProviderKey::Youtrack,
    ];

    /// Name shown to the user in notifications.
    pub fn humanized(&self) -> &'static str {
        match self {
            IssueProviderKey::Jira => "Jira",
            IssueProviderKey::Github => "GitHub",
            IssueProviderKey::Gitlab => "GitLab",
            IssueProviderKey::Caldav => "CalDAV",
            IssueProviderKey::Ical => "Calendar",
            IssueProviderKey::OpenProject => "OpenProject",
            IssueProviderKey::Gitea => "Gitea",
            IssueProviderKey::Redmine => "Redmine",
            IssueProviderKey::Youtrack => "YouTrack",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueProviderKey::Jira => "JIRA",
            IssueProviderKey::Github => "GITHUB",
            IssueProviderKey::Gitlab => "GITLAB",
            IssueProviderKey::Caldav => "CALDAV",
            IssueProviderKey::Ical => "ICAL",
            IssueProviderKey::OpenProject => "OPEN_PROJECT",
            IssueProviderKey::Gitea => "GITEA",
            IssueProviderKey::Redmine => "REDMINE",
            IssueProviderKey::Youtrack => "YOUTRACK",
        }
    }
}

impl fmt::Display for IssueProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote issue identifier. Trackers use both numeric and string ids, so
/// they are always carried as strings locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueId(pub String);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IssueId {
    fn from(s: String) -> Self {
        IssueId(s)
    }
}

impl From<&str> for IssueId {
    fn from(s: &str) -> Self {
        IssueId(s.to_string())
    }
}

impl From<u64> for IssueId {
    fn from(n: u64) -> Self {
        IssueId(n.to_string())
    }
}

/// Full issue payload of any provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issueType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueData {
    Youtrack(YoutrackIssue),
}

impl IssueData {
    pub fn key(&self) -> IssueProviderKey {
        match self {
            IssueData::Youtrack(_) => IssueProviderKey::Youtrack,
        }
    }

    pub fn id(&self) -> IssueId {
        match self {
            IssueData::Youtrack(issue) => IssueId(issue.id.clone()),
        }
    }

    pub fn title(&self) -> String {
        match self {
            IssueData::Youtrack(issue) => issue.display_title(),
        }
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        match self {
            IssueData::Youtrack(issue) => issue.updated_at(),
        }
    }
}

/// Reduced issue payloads (search results, backlog candidates) share the
/// full shape for every provider implemented so far.
pub type IssueDataReduced = IssueData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub title: String,
    pub issue_type: IssueProviderKey,
    pub issue_data: IssueDataReduced,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_highlighted: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItemWithProviderId {
    #[serde(flatten)]
    pub item: SearchResultItem,
    pub issue_provider_id: ProviderId,
}

/// What a provider contributes when a task is created from one of its issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTask {
    pub title: String,
    pub issue_id: IssueId,
    pub issue_type: IssueProviderKey,
    pub issue_last_updated: Option<DateTime<Utc>>,
    pub issue_attachment_nr: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAttachment {
    pub title: String,
    pub path: String,
    pub kind: String,
}
