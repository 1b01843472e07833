use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{is_youtrack_enabled, YoutrackClient, DEFAULT_BACKLOG_QUERY, YOUTRACK_POLL_INTERVAL};
use crate::adapters::render::highlight_matches;
use crate::domain::{
    DomainError, IssueData, IssueDataReduced, IssueId, IssueProvider, IssueProviderKey, IssueTask,
    ProviderId, SearchResultItem, Task, TaskAttachment, TaskChanges, YoutrackIssue,
};
use crate::ports::{
    collect_fresh_data, get_cfg_once, IssueService, ProviderConfigStore, ProviderResult,
    RefreshData, TaskRefresh,
};

const KEY: IssueProviderKey = IssueProviderKey::Youtrack;

/// Changes to apply to `task` when `issue` was updated after the task last
/// saw it. Issues without an update stamp are never considered changed.
pub(crate) fn fresh_task_changes(task: &Task, issue: &YoutrackIssue) -> Option<TaskChanges> {
    let remote_updated = issue.updated_at()?;

    if let Some(local_updated) = task.issue_last_updated {
        if remote_updated <= local_updated {
            return None;
        }
    }

    let title = issue.display_title();
    Some(TaskChanges {
        title: (title != task.title).then_some(title),
        issue_was_updated: Some(true),
        issue_last_updated: Some(remote_updated),
        ..Default::default()
    })
}

fn convert_to_result(issue: YoutrackIssue, search_term: &str) -> SearchResultItem {
    let title = issue.display_title();
    let title_highlighted = highlight_matches(&title, search_term).or(issue.summary.clone());

    SearchResultItem {
        title,
        issue_type: KEY,
        issue_data: IssueData::Youtrack(issue),
        title_highlighted,
    }
}

pub struct YoutrackIssueService {
    api: Arc<YoutrackClient>,
    config_store: Arc<dyn ProviderConfigStore>,
}

impl YoutrackIssueService {
    pub fn new(api: Arc<YoutrackClient>, config_store: Arc<dyn ProviderConfigStore>) -> Self {
        Self { api, config_store }
    }

    async fn cfg_once(&self, provider_id: &ProviderId) -> ProviderResult<IssueProvider> {
        Ok(get_cfg_once(self.config_store.as_ref(), provider_id, KEY).await?)
    }
}

#[async_trait]
impl IssueService for YoutrackIssueService {
    fn key(&self) -> IssueProviderKey {
        KEY
    }

    fn poll_interval(&self) -> Duration {
        YOUTRACK_POLL_INTERVAL
    }

    fn is_enabled(&self, cfg: &IssueProvider) -> bool {
        cfg.key() == KEY && is_youtrack_enabled(cfg)
    }

    async fn test_connection(&self, cfg: &IssueProvider) -> ProviderResult<bool> {
        let user = self.api.get_me(cfg.youtrack()?).await?;
        tracing::info!(
            provider = %cfg.id,
            login = user.profile.login.as_deref().unwrap_or("?"),
            "YouTrack connection ok"
        );
        Ok(user.profile.id.is_some() || user.profile.login.is_some())
    }

    async fn issue_link(
        &self,
        issue_id: &IssueId,
        provider_id: &ProviderId,
    ) -> ProviderResult<String> {
        let cfg = self.cfg_once(provider_id).await?;
        Ok(format!(
            "{}/issue/{}",
            cfg.youtrack()?.base_url(),
            urlencoding::encode(&issue_id.0)
        ))
    }

    async fn get_by_id(
        &self,
        issue_id: &IssueId,
        provider_id: &ProviderId,
    ) -> ProviderResult<IssueData> {
        let cfg = self.cfg_once(provider_id).await?;
        let issue = self.api.get_by_id(issue_id, cfg.youtrack()?).await?;
        Ok(IssueData::Youtrack(issue))
    }

    async fn search_issues(
        &self,
        search_term: &str,
        provider_id: &ProviderId,
    ) -> ProviderResult<Vec<SearchResultItem>> {
        let cfg = self.cfg_once(provider_id).await?;
        if !self.is_enabled(&cfg) {
            return Ok(Vec::new());
        }

        let issues = self.api.search_issue(search_term, cfg.youtrack()?).await?;
        Ok(issues
            .into_iter()
            .map(|issue| convert_to_result(issue, search_term))
            .collect())
    }

    fn get_add_task_data(&self, issue: &IssueDataReduced) -> IssueTask {
        IssueTask {
            title: issue.title(),
            issue_id: issue.id(),
            issue_type: issue.key(),
            issue_last_updated: issue.updated_at(),
            issue_attachment_nr: None,
        }
    }

    async fn get_fresh_data_for_issue_task(
        &self,
        task: &Task,
    ) -> ProviderResult<Option<RefreshData>> {
        let provider_id = task
            .issue_provider_id
            .as_ref()
            .ok_or_else(|| DomainError::MissingField("issueProviderId".to_string()))?;
        let issue_id = task
            .issue_id
            .as_ref()
            .ok_or_else(|| DomainError::MissingField("issueId".to_string()))?;

        let cfg = self.cfg_once(provider_id).await?;
        let issue = self.api.get_by_id(issue_id, cfg.youtrack()?).await?;

        tracing::debug!(task = %task.id, issue = %issue.id, "Comparing task with YouTrack issue");

        Ok(fresh_task_changes(task, &issue).map(|task_changes| RefreshData {
            task_changes,
            issue_title: issue.display_title(),
            issue: IssueData::Youtrack(issue),
        }))
    }

    async fn get_fresh_data_for_issue_tasks(
        &self,
        tasks: &[Task],
    ) -> ProviderResult<Vec<TaskRefresh>> {
        collect_fresh_data(self, tasks).await
    }

    fn get_mapped_attachments(&self, _issue: &IssueData) -> Vec<TaskAttachment> {
        Vec::new()
    }

    async fn get_new_issues_to_add_to_backlog(
        &self,
        provider_id: &ProviderId,
        all_existing_issue_ids: &[IssueId],
    ) -> ProviderResult<Vec<IssueDataReduced>> {
        let cfg = self.cfg_once(provider_id).await?;
        if !self.is_enabled(&cfg) || !cfg.is_auto_add_to_backlog {
            tracing::debug!(provider = %provider_id, "Not fetching YouTrack backlog issues");
            return Ok(Vec::new());
        }

        let query = cfg
            .pinned_search
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(DEFAULT_BACKLOG_QUERY);

        let issues = self.api.search_issue(query, cfg.youtrack()?).await?;
        Ok(issues
            .into_iter()
            .filter(|issue| !all_existing_issue_ids.iter().any(|id| id.0 == issue.id))
            .map(IssueData::Youtrack)
            .collect())
    }

    async fn update_issue_from_task(&self, task: &Task) -> ProviderResult<()> {
        // YouTrack is read-only for now.
        tracing::debug!(task = %task.id, "Ignoring YouTrack write for task");
        Ok(())
    }
}
