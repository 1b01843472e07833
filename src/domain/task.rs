use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{IssueId, IssueProviderKey, IssueTask, ProviderId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn generate() -> Self {
        TaskId(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

/// A local task, optionally linked to a remote issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_done: bool,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub issue_id: Option<IssueId>,
    #[serde(default)]
    pub issue_provider_id: Option<ProviderId>,
    #[serde(default)]
    pub issue_type: Option<IssueProviderKey>,
    #[serde(default)]
    pub issue_was_updated: bool,
    #[serde(default)]
    pub issue_last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub issue_attachment_nr: Option<usize>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::generate(),
            title: title.into(),
            notes: None,
            is_done: false,
            created: Utc::now(),
            project_id: None,
            issue_id: None,
            issue_provider_id: None,
            issue_type: None,
            issue_was_updated: false,
            issue_last_updated: None,
            issue_attachment_nr: None,
        }
    }

    /// Build a task for an imported issue.
    pub fn from_issue(
        issue_task: IssueTask,
        provider_id: ProviderId,
        project_id: Option<String>,
    ) -> Self {
        Self {
            project_id,
            issue_id: Some(issue_task.issue_id),
            issue_provider_id: Some(provider_id),
            issue_type: Some(issue_task.issue_type),
            issue_last_updated: issue_task.issue_last_updated,
            issue_attachment_nr: issue_task.issue_attachment_nr,
            ..Self::new(issue_task.title)
        }
    }

    pub fn is_linked_to(&self, provider_id: &ProviderId, issue_id: &IssueId) -> bool {
        self.issue_provider_id.as_ref() == Some(provider_id)
            && self.issue_id.as_ref() == Some(issue_id)
    }
}

/// Partial update of a task. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub is_done: Option<bool>,
    pub issue_was_updated: Option<bool>,
    pub issue_last_updated: Option<DateTime<Utc>>,
    pub issue_attachment_nr: Option<usize>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        *self == TaskChanges::default()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
        if let Some(is_done) = self.is_done {
            task.is_done = is_done;
        }
        if let Some(was_updated) = self.issue_was_updated {
            task.issue_was_updated = was_updated;
        }
        if let Some(last_updated) = self.issue_last_updated {
            task.issue_last_updated = Some(last_updated);
        }
        if let Some(nr) = self.issue_attachment_nr {
            task.issue_attachment_nr = Some(nr);
        }
    }
}
