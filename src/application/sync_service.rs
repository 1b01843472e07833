use std::sync::Arc;
use std::time::Duration;

use super::{AppError, AppResult, IssueServiceRegistry};
use crate::domain::{
    IssueData, IssueId, IssueProvider, ProviderId, SearchResultItemWithProviderId, Task, TaskChanges,
    TaskId,
};
use crate::ports::{
    ConfigError, IssueService, Notification, NotificationSink, ProviderConfigStore, TaskStore,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Created(Task),
    AlreadyImported(Task),
}

/// Entry point for everything the application does with issue providers.
/// Dispatches to the provider's [`IssueService`] and writes results back to
/// the task store.
pub struct IssueSyncService {
    registry: IssueServiceRegistry,
    config_store: Arc<dyn ProviderConfigStore>,
    task_store: Arc<dyn TaskStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl IssueSyncService {
    pub fn new(
        registry: IssueServiceRegistry,
        config_store: Arc<dyn ProviderConfigStore>,
        task_store: Arc<dyn TaskStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            registry,
            config_store,
            task_store,
            notifier,
        }
    }

    async fn provider(
        &self,
        provider_id: &ProviderId,
    ) -> AppResult<(IssueProvider, Arc<dyn IssueService>)> {
        let cfg = self
            .config_store
            .get_provider(provider_id)
            .await?
            .ok_or_else(|| ConfigError::ProviderNotFound(provider_id.clone()))?;
        let service = self.registry.get(cfg.key())?;
        Ok((cfg, service))
    }

    pub async fn list_providers(&self) -> AppResult<Vec<IssueProvider>> {
        Ok(self.config_store.list_providers().await?)
    }

    /// Enabled, auto-polled providers with their poll interval.
    pub async fn pollable_providers(&self) -> AppResult<Vec<(ProviderId, Duration)>> {
        let mut pollable = Vec::new();
        for cfg in self.list_providers().await? {
            if !cfg.is_auto_poll {
                continue;
            }
            match self.registry.get(cfg.key()) {
                Ok(service) if service.is_enabled(&cfg) => {
                    pollable.push((cfg.id.clone(), service.poll_interval()));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(provider = %cfg.id, "Skipping provider: {}", e),
            }
        }
        Ok(pollable)
    }

    pub async fn test_connection(&self, provider_id: &ProviderId) -> AppResult<bool> {
        let (cfg, service) = self.provider(provider_id).await?;
        let name = cfg.key().humanized();

        let ok = service.test_connection(&cfg).await?;
        if ok {
            self.notifier
                .notify(Notification::success(format!("{name}: Connection works")));
        } else {
            self.notifier.notify(Notification::error(format!(
                "{name}: Connection test returned no user"
            )));
        }
        Ok(ok)
    }

    pub async fn issue_link(&self, provider_id: &ProviderId, issue_id: &IssueId) -> AppResult<String> {
        let (_, service) = self.provider(provider_id).await?;
        Ok(service.issue_link(issue_id, provider_id).await?)
    }

    pub async fn get_by_id(&self, provider_id: &ProviderId, issue_id: &IssueId) -> AppResult<IssueData> {
        let (_, service) = self.provider(provider_id).await?;
        Ok(service.get_by_id(issue_id, provider_id).await?)
    }

    pub async fn search_issues(
        &self,
        provider_id: &ProviderId,
        search_term: &str,
    ) -> AppResult<Vec<SearchResultItemWithProviderId>> {
        let (_, service) = self.provider(provider_id).await?;
        let items = service.search_issues(search_term, provider_id).await?;

        Ok(items
            .into_iter()
            .map(|item| SearchResultItemWithProviderId {
                item,
                issue_provider_id: provider_id.clone(),
            })
            .collect())
    }

    /// Search every enabled provider that takes part in the add-task bar.
    /// A failing provider is skipped so the others still return results.
    pub async fn search_all(&self, search_term: &str) -> AppResult<Vec<SearchResultItemWithProviderId>> {
        let searchable: Vec<ProviderId> = self
            .list_providers()
            .await?
            .into_iter()
            .filter(|cfg| cfg.is_enabled && cfg.is_integrated_add_task_bar)
            .map(|cfg| cfg.id)
            .collect();

        let searches = searchable
            .iter()
            .map(|id| async move { (id, self.search_issues(id, search_term).await) });

        let mut results = Vec::new();
        for (id, outcome) in futures::future::join_all(searches).await {
            match outcome {
                Ok(items) => results.extend(items),
                Err(e) => tracing::warn!(provider = %id, "Search failed: {}", e),
            }
        }
        Ok(results)
    }

    /// Create a local task for a remote issue unless one already exists.
    pub async fn add_task_from_issue(
        &self,
        provider_id: &ProviderId,
        issue_id: &IssueId,
    ) -> AppResult<ImportOutcome> {
        let (cfg, service) = self.provider(provider_id).await?;

        if let Some(existing) = self.task_store.find_by_issue(provider_id, issue_id).await? {
            return Ok(self.already_imported(issue_id, existing));
        }

        // Trackers accept readable ids (`DEMO-17`) but tasks store the canonical one.
        let issue = service.get_by_id(issue_id, provider_id).await?;
        let canonical_id = issue.id();
        if &canonical_id != issue_id {
            if let Some(existing) = self
                .task_store
                .find_by_issue(provider_id, &canonical_id)
                .await?
            {
                return Ok(self.already_imported(issue_id, existing));
            }
        }

        let task = self.task_for_issue(&cfg, service.as_ref(), &issue);
        let task = self.task_store.add_task(task).await?;

        self.notifier.notify(Notification::success(format!(
            "{}: Imported \"{}\"",
            cfg.key().humanized(),
            task.title
        )));
        Ok(ImportOutcome::Created(task))
    }

    fn already_imported(&self, issue_id: &IssueId, existing: Task) -> ImportOutcome {
        self.notifier.notify(Notification::info(format!(
            "Issue {} is already imported as \"{}\"",
            issue_id, existing.title
        )));
        ImportOutcome::AlreadyImported(existing)
    }

    fn task_for_issue(&self, cfg: &IssueProvider, service: &dyn IssueService, issue: &IssueData) -> Task {
        let mut data = service.get_add_task_data(issue);
        let attachments = service.get_mapped_attachments(issue);
        if !attachments.is_empty() {
            data.issue_attachment_nr = Some(attachments.len());
        }
        Task::from_issue(data, cfg.id.clone(), cfg.default_project_id.clone())
    }

    /// Pull remote changes into every open task of the provider.
    /// Returns the number of tasks that changed.
    pub async fn refresh_issue_tasks(&self, provider_id: &ProviderId) -> AppResult<usize> {
        let (cfg, service) = self.provider(provider_id).await?;
        if !service.is_enabled(&cfg) {
            tracing::debug!(provider = %provider_id, "Provider disabled, not refreshing");
            return Ok(0);
        }

        let tasks = self.task_store.list_issue_tasks(provider_id).await?;
        if tasks.is_empty() {
            return Ok(0);
        }

        let refreshes = service.get_fresh_data_for_issue_tasks(&tasks).await?;
        let mut updated = 0;
        for refresh in refreshes {
            if refresh.task_changes.is_empty() {
                continue;
            }
            let task = self
                .task_store
                .update_task(&refresh.task.id, &refresh.task_changes)
                .await?;
            updated += 1;
            self.notifier.notify(Notification::info(format!(
                "{}: \"{}\" was updated",
                cfg.key().humanized(),
                task.title
            )));
        }

        tracing::info!(provider = %provider_id, checked = tasks.len(), updated, "Refreshed issue tasks");
        Ok(updated)
    }

    /// Refresh every enabled provider. A failing provider is reported and
    /// skipped so the others still refresh.
    pub async fn refresh_all(&self) -> AppResult<usize> {
        let mut updated = 0;
        for cfg in self.list_providers().await? {
            if !cfg.is_enabled {
                continue;
            }
            match self.refresh_issue_tasks(&cfg.id).await {
                Ok(count) => updated += count,
                Err(e) => {
                    tracing::warn!(provider = %cfg.id, "Refresh failed: {}", e);
                    self.report_error(&e);
                }
            }
        }
        Ok(updated)
    }

    /// Import remote issues the provider offers for the backlog.
    pub async fn add_new_issues_to_backlog(&self, provider_id: &ProviderId) -> AppResult<Vec<Task>> {
        let (cfg, service) = self.provider(provider_id).await?;

        let existing = self.task_store.issue_ids_for_provider(provider_id).await?;
        let issues = service
            .get_new_issues_to_add_to_backlog(provider_id, &existing)
            .await?;

        let mut added = Vec::with_capacity(issues.len());
        for issue in issues {
            if existing.contains(&issue.id()) {
                continue;
            }
            let task = self.task_for_issue(&cfg, service.as_ref(), &issue);
            added.push(self.task_store.add_task(task).await?);
        }

        if !added.is_empty() {
            self.notifier.notify(Notification::success(format!(
                "{}: Added {} new issue(s) to the backlog",
                cfg.key().humanized(),
                added.len()
            )));
        }
        Ok(added)
    }

    /// Push local task state to the remote issue, where the provider supports it.
    pub async fn update_issue_from_task(&self, task_id: &TaskId) -> AppResult<()> {
        let task = self.task_store.get_task(task_id).await?;
        let provider_id = task
            .issue_provider_id
            .clone()
            .ok_or_else(|| AppError::TaskNotLinked(task_id.clone()))?;

        let (_, service) = self.provider(&provider_id).await?;
        service.update_issue_from_task(&task).await?;
        Ok(())
    }

    /// Mark a task as seen so it no longer shows as updated.
    pub async fn acknowledge_update(&self, task_id: &TaskId) -> AppResult<Task> {
        let changes = TaskChanges {
            issue_was_updated: Some(false),
            ..Default::default()
        };
        Ok(self.task_store.update_task(task_id, &changes).await?)
    }

    pub async fn list_tasks(&self) -> AppResult<Vec<Task>> {
        Ok(self.task_store.list_tasks().await?)
    }

    /// Surface an error to the user unless the provider client already did.
    pub fn report_error(&self, error: &AppError) {
        if !error.is_notified() {
            self.notifier.notify(Notification::error(error.to_string()));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::notify::RecordingNotifier;
    use crate::adapters::store::JsonTaskStore;
    use crate::domain::{
        IssueProviderKey, IssueTask, ProviderSettings, YoutrackCfg, YoutrackIssue,
    };
    use crate::ports::{
        MockIssueService, MockProviderConfigStore, NotificationKind, ProviderError, TaskRefresh,
    };
    use chrono::DateTime;

    pub(crate) fn provider(id: &str) -> IssueProvider {
        let mut provider = IssueProvider::new(ProviderSettings::Youtrack(YoutrackCfg {
            server: "https://yt.example.com".to_string(),
            token: None,
        }));
        provider.id = ProviderId::from(id);
        provider
    }

    pub(crate) fn issue(id: &str, summary: &str) -> IssueData {
        IssueData::Youtrack(YoutrackIssue {
            id: id.to_string(),
            summary: Some(summary.to_string()),
            updated: Some(1_000),
            ..Default::default()
        })
    }

    pub(crate) fn config_store(providers: Vec<IssueProvider>) -> MockProviderConfigStore {
        let mut store = MockProviderConfigStore::new();
        let all = providers.clone();
        store
            .expect_list_providers()
            .returning(move || Ok(all.clone()));
        store
            .expect_get_provider()
            .returning(move |id| Ok(providers.iter().find(|p| &p.id == id).cloned()));
        store
    }

    /// Mock service with the pure parts of the YouTrack behaviour.
    pub(crate) fn base_service() -> MockIssueService {
        let mut service = MockIssueService::new();
        service.expect_key().return_const(IssueProviderKey::Youtrack);
        service
            .expect_poll_interval()
            .return_const(Duration::from_millis(20));
        service.expect_is_enabled().returning(|cfg| cfg.is_enabled);
        service.expect_get_add_task_data().returning(|issue| IssueTask {
            title: issue.title(),
            issue_id: issue.id(),
            issue_type: issue.key(),
            issue_last_updated: issue.updated_at(),
            issue_attachment_nr: None,
        });
        service.expect_get_mapped_attachments().returning(|_| Vec::new());
        service
    }

    pub(crate) fn sync_service(
        service: MockIssueService,
        providers: Vec<IssueProvider>,
        tasks: Arc<JsonTaskStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> IssueSyncService {
        IssueSyncService::new(
            IssueServiceRegistry::new().with(Arc::new(service)),
            Arc::new(config_store(providers)),
            tasks,
            notifier,
        )
    }

    #[tokio::test]
    async fn imports_issue_once() {
        let mut service = base_service();
        service
            .expect_get_by_id()
            .times(1)
            .returning(|id, _| Ok(issue(&id.0, "Crash on start")));
        let tasks = Arc::new(JsonTaskStore::in_memory());
        let notifier = Arc::new(RecordingNotifier::default());
        let sync = sync_service(service, vec![provider("yt")], tasks.clone(), notifier.clone());

        let first = sync
            .add_task_from_issue(&ProviderId::from("yt"), &IssueId::from("2-1"))
            .await
            .unwrap();
        let ImportOutcome::Created(task) = first else {
            panic!("expected a new task");
        };
        assert_eq!(task.title, "Crash on start");
        assert_eq!(task.issue_provider_id, Some(ProviderId::from("yt")));
        assert_eq!(task.issue_last_updated, DateTime::from_timestamp_millis(1_000));

        let second = sync
            .add_task_from_issue(&ProviderId::from("yt"), &IssueId::from("2-1"))
            .await
            .unwrap();
        assert!(matches!(second, ImportOutcome::AlreadyImported(_)));
        assert_eq!(tasks.list_tasks().await.unwrap().len(), 1);

        let kinds: Vec<_> = notifier.take().into_iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Success, NotificationKind::Info]);
    }

    #[tokio::test]
    async fn readable_id_import_is_deduplicated() {
        let mut service = base_service();
        service
            .expect_get_by_id()
            .withf(|id, _| id.0 == "DEMO-17")
            .times(2)
            .returning(|_, _| Ok(issue("2-17", "Crash on start")));
        let tasks = Arc::new(JsonTaskStore::in_memory());
        let notifier = Arc::new(RecordingNotifier::default());
        let sync = sync_service(service, vec![provider("yt")], tasks.clone(), notifier.clone());

        let first = sync
            .add_task_from_issue(&ProviderId::from("yt"), &IssueId::from("DEMO-17"))
            .await
            .unwrap();
        let second = sync
            .add_task_from_issue(&ProviderId::from("yt"), &IssueId::from("DEMO-17"))
            .await
            .unwrap();

        let ImportOutcome::Created(created) = first else {
            panic!("expected a new task");
        };
        assert_eq!(created.issue_id, Some(IssueId::from("2-17")));
        assert_eq!(second, ImportOutcome::AlreadyImported(created));
        assert_eq!(tasks.list_tasks().await.unwrap().len(), 1);

        let kinds: Vec<_> = notifier.take().into_iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Success, NotificationKind::Info]);
    }

    #[tokio::test]
    async fn refresh_applies_remote_changes() {
        let mut service = base_service();
        service
            .expect_get_fresh_data_for_issue_tasks()
            .times(1)
            .returning(|tasks| {
                Ok(tasks
                    .iter()
                    .map(|task| TaskRefresh {
                        task: task.clone(),
                        task_changes: TaskChanges {
                            title: Some("Renamed".to_string()),
                            issue_was_updated: Some(true),
                            ..Default::default()
                        },
                        issue: issue("2-1", "Renamed"),
                    })
                    .collect())
            });

        let tasks = Arc::new(JsonTaskStore::in_memory());
        let mut linked = Task::new("Original");
        linked.issue_provider_id = Some(ProviderId::from("yt"));
        linked.issue_id = Some(IssueId::from("2-1"));
        let linked = tasks.add_task(linked).await.unwrap();
        tasks.add_task(Task::new("Unrelated")).await.unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let sync = sync_service(service, vec![provider("yt")], tasks.clone(), notifier.clone());

        let updated = sync.refresh_issue_tasks(&ProviderId::from("yt")).await.unwrap();

        assert_eq!(updated, 1);
        let task = tasks.get_task(&linked.id).await.unwrap();
        assert_eq!(task.title, "Renamed");
        assert!(task.issue_was_updated);
        assert_eq!(notifier.take().len(), 1);

        let acknowledged = sync.acknowledge_update(&linked.id).await.unwrap();
        assert!(!acknowledged.issue_was_updated);
    }

    #[tokio::test]
    async fn refresh_all_continues_past_failing_provider() {
        let mut service = base_service();
        service
            .expect_get_fresh_data_for_issue_tasks()
            .times(2)
            .returning(|tasks| {
                if tasks[0].issue_provider_id == Some(ProviderId::from("broken")) {
                    return Err(ProviderError::Serialization("bad payload".to_string()));
                }
                Ok(tasks
                    .iter()
                    .map(|task| TaskRefresh {
                        task: task.clone(),
                        task_changes: TaskChanges {
                            issue_was_updated: Some(true),
                            ..Default::default()
                        },
                        issue: issue("2-1", "Original"),
                    })
                    .collect())
            });

        let tasks = Arc::new(JsonTaskStore::in_memory());
        for provider_id in ["broken", "ok"] {
            let mut linked = Task::new("Original");
            linked.issue_provider_id = Some(ProviderId::from(provider_id));
            linked.issue_id = Some(IssueId::from("2-1"));
            tasks.add_task(linked).await.unwrap();
        }

        let notifier = Arc::new(RecordingNotifier::default());
        let sync = sync_service(
            service,
            vec![provider("broken"), provider("ok")],
            tasks,
            notifier.clone(),
        );

        assert_eq!(sync.refresh_all().await.unwrap(), 1);

        let kinds: Vec<_> = notifier.take().into_iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Error, NotificationKind::Info]);
    }

    #[tokio::test]
    async fn refresh_skips_disabled_provider() {
        let mut service = base_service();
        service.expect_get_fresh_data_for_issue_tasks().never();
        let mut cfg = provider("yt");
        cfg.is_enabled = false;

        let sync = sync_service(
            service,
            vec![cfg],
            Arc::new(JsonTaskStore::in_memory()),
            Arc::new(RecordingNotifier::default()),
        );

        assert_eq!(sync.refresh_issue_tasks(&ProviderId::from("yt")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn backlog_import_passes_known_ids() {
        let mut service = base_service();
        service
            .expect_get_new_issues_to_add_to_backlog()
            .withf(|_, existing| existing.to_vec() == vec![IssueId::from("2-1")])
            .returning(|_, _| Ok(vec![issue("2-2", "Fresh")]));

        let tasks = Arc::new(JsonTaskStore::in_memory());
        let mut known = Task::new("Known");
        known.issue_provider_id = Some(ProviderId::from("yt"));
        known.issue_id = Some(IssueId::from("2-1"));
        tasks.add_task(known).await.unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let sync = sync_service(service, vec![provider("yt")], tasks.clone(), notifier.clone());

        let added = sync
            .add_new_issues_to_backlog(&ProviderId::from("yt"))
            .await
            .unwrap();

        assert_eq!(added.len(), 1);
        assert_eq!(added[0].title, "Fresh");
        assert_eq!(tasks.list_tasks().await.unwrap().len(), 2);
        assert_eq!(notifier.take().len(), 1);
    }

    #[tokio::test]
    async fn search_all_skips_failing_providers() {
        let mut service = base_service();
        service.expect_search_issues().returning(|term, provider_id| {
            if provider_id.0 == "broken" {
                return Err(ProviderError::Handled("Youtrack: HTTP 500".to_string()));
            }
            Ok(vec![crate::domain::SearchResultItem {
                title: term.to_string(),
                issue_type: IssueProviderKey::Youtrack,
                issue_data: issue("2-1", term),
                title_highlighted: None,
            }])
        });

        let mut hidden = provider("hidden");
        hidden.is_integrated_add_task_bar = false;
        let sync = sync_service(
            service,
            vec![provider("ok"), provider("broken"), hidden],
            Arc::new(JsonTaskStore::in_memory()),
            Arc::new(RecordingNotifier::default()),
        );

        let results = sync.search_all("crash").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].issue_provider_id, ProviderId::from("ok"));
        assert_eq!(results[0].item.title, "crash");
    }

    #[tokio::test]
    async fn unsupported_provider_key_is_an_error() {
        let sync = IssueSyncService::new(
            IssueServiceRegistry::new(),
            Arc::new(config_store(vec![provider("yt")])),
            Arc::new(JsonTaskStore::in_memory()),
            Arc::new(RecordingNotifier::default()),
        );

        let err = sync
            .get_by_id(&ProviderId::from("yt"), &IssueId::from("1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::UnsupportedProvider(IssueProviderKey::Youtrack)
        ));
    }

    #[tokio::test]
    async fn update_requires_linked_task() {
        let tasks = Arc::new(JsonTaskStore::in_memory());
        let task = tasks.add_task(Task::new("Local only")).await.unwrap();
        let sync = sync_service(
            base_service(),
            vec![provider("yt")],
            tasks,
            Arc::new(RecordingNotifier::default()),
        );

        let err = sync.update_issue_from_task(&task.id).await.unwrap_err();
        assert!(matches!(err, AppError::TaskNotLinked(_)));
    }

    #[tokio::test]
    async fn connection_test_notifies_success() {
        let mut service = base_service();
        service.expect_test_connection().returning(|_| Ok(true));
        let notifier = Arc::new(RecordingNotifier::default());
        let sync = sync_service(
            service,
            vec![provider("yt")],
            Arc::new(JsonTaskStore::in_memory()),
            notifier.clone(),
        );

        assert!(sync.test_connection(&ProviderId::from("yt")).await.unwrap());
        let sent = notifier.take();
        assert_eq!(sent[0].kind, NotificationKind::Success);
        assert_eq!(sent[0].message, "YouTrack: Connection works");
    }

    #[test]
    fn report_error_skips_already_notified_errors() {
        let notifier = Arc::new(RecordingNotifier::default());
        let sync = sync_service(
            base_service(),
            Vec::new(),
            Arc::new(JsonTaskStore::in_memory()),
            notifier.clone(),
        );

        sync.report_error(&AppError::Provider(ProviderError::Handled(
            "Youtrack: HTTP 500".to_string(),
        )));
        sync.report_error(&AppError::TaskNotLinked(TaskId::from("t1")));

        let sent = notifier.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Error);
    }
}
