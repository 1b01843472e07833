use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use super::ConfigError;
use crate::domain::{
    DomainError, IssueData, IssueDataReduced, IssueId, IssueProvider, IssueProviderKey, IssueTask,
    ProviderId, SearchResultItem, Task, TaskAttachment, TaskChanges,
};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider}: network error: {message}")]
    Network {
        provider: IssueProviderKey,
        message: String,
    },

    #[error("{provider}: cannot create HTTP client: {message}")]
    ClientSetup {
        provider: IssueProviderKey,
        message: String,
    },

    #[error("{provider}: not enough settings")]
    NotConfigured { provider: IssueProviderKey },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimit(u64),

    /// The request failed and the user has already been told about it.
    #[error("{0}")]
    Handled(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Fresh remote state for one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshData {
    pub task_changes: TaskChanges,
    pub issue: IssueData,
    pub issue_title: String,
}

/// Fresh remote state paired with the task it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRefresh {
    pub task: Task,
    pub task_changes: TaskChanges,
    pub issue: IssueData,
}

/// Capabilities every issue provider implements.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueService: Send + Sync {
    fn key(&self) -> IssueProviderKey;

    /// How often tasks linked to this provider should be refreshed.
    fn poll_interval(&self) -> Duration;

    fn is_enabled(&self, cfg: &IssueProvider) -> bool;

    async fn test_connection(&self, cfg: &IssueProvider) -> ProviderResult<bool>;

    async fn issue_link(
        &self,
        issue_id: &IssueId,
        provider_id: &ProviderId,
    ) -> ProviderResult<String>;

    async fn get_by_id(
        &self,
        issue_id: &IssueId,
        provider_id: &ProviderId,
    ) -> ProviderResult<IssueData>;

    async fn search_issues(
        &self,
        search_term: &str,
        provider_id: &ProviderId,
    ) -> ProviderResult<Vec<SearchResultItem>>;

    fn get_add_task_data(&self, issue: &IssueDataReduced) -> IssueTask;

    /// `None` when the remote issue has not changed since the task last saw it.
    async fn get_fresh_data_for_issue_task(
        &self,
        task: &Task,
    ) -> ProviderResult<Option<RefreshData>>;

    /// Fails if any single lookup fails. Tasks without changes are dropped.
    async fn get_fresh_data_for_issue_tasks(
        &self,
        tasks: &[Task],
    ) -> ProviderResult<Vec<TaskRefresh>>;

    fn get_mapped_attachments(&self, issue: &IssueData) -> Vec<TaskAttachment>;

    async fn get_new_issues_to_add_to_backlog(
        &self,
        provider_id: &ProviderId,
        all_existing_issue_ids: &[IssueId],
    ) -> ProviderResult<Vec<IssueDataReduced>>;

    async fn update_issue_from_task(&self, task: &Task) -> ProviderResult<()>;
}

/// Fan `get_fresh_data_for_issue_task` out over `tasks` concurrently.
pub async fn collect_fresh_data<S>(service: &S, tasks: &[Task]) -> ProviderResult<Vec<TaskRefresh>>
where
    S: IssueService + ?Sized,
{
    let lookups = tasks.iter().map(|task| async move {
        service
            .get_fresh_data_for_issue_task(task)
            .await
            .map(|refresh| (task, refresh))
    });

    let results = futures::future::try_join_all(lookups).await?;

    Ok(results
        .into_iter()
        .filter_map(|(task, refresh)| {
            refresh.map(|data| TaskRefresh {
                task: task.clone(),
                task_changes: data.task_changes,
                issue: data.issue,
            })
        })
        .collect())
}
