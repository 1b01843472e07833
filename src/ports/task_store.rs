use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{IssueId, ProviderId, Task, TaskChanges, TaskId};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Failed to read tasks: {0}")]
    Read(String),

    #[error("Failed to write tasks: {0}")]
    Write(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Access to the application's local tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;
    async fn get_task(&self, id: &TaskId) -> StoreResult<Task>;
    async fn add_task(&self, task: Task) -> StoreResult<Task>;
    async fn update_task(&self, id: &TaskId, changes: &TaskChanges) -> StoreResult<Task>;

    /// Open tasks linked to `provider_id`.
    async fn list_issue_tasks(&self, provider_id: &ProviderId) -> StoreResult<Vec<Task>> {
        Ok(self
            .list_tasks()
            .await?
            .into_iter()
            .filter(|t| !t.is_done && t.issue_provider_id.as_ref() == Some(provider_id))
            .collect())
    }

    async fn find_by_issue(
        &self,
        provider_id: &ProviderId,
        issue_id: &IssueId,
    ) -> StoreResult<Option<Task>> {
        Ok(self
            .list_tasks()
            .await?
            .into_iter()
            .find(|t| t.is_linked_to(provider_id, issue_id)))
    }

    /// Issue ids of every task linked to `provider_id`, done or not.
    async fn issue_ids_for_provider(&self, provider_id: &ProviderId) -> StoreResult<Vec<IssueId>> {
        Ok(self
            .list_tasks()
            .await?
            .into_iter()
            .filter(|t| t.issue_provider_id.as_ref() == Some(provider_id))
            .filter_map(|t| t.issue_id)
            .collect())
    }
}
