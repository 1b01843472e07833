use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};

use super::{AppResult, IssueSyncService};
use crate::domain::ProviderId;

/// Outcome of one poll of one provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub refreshed: usize,
    pub imported: usize,
}

/// Periodically refreshes issue tasks of every auto-polled provider.
/// A failed poll is logged and retried at the next regular tick.
pub struct IssuePoller {
    sync: Arc<IssueSyncService>,
    initial_delay: Duration,
}

impl IssuePoller {
    pub fn new(sync: Arc<IssueSyncService>, initial_delay: Duration) -> Self {
        Self {
            sync,
            initial_delay,
        }
    }

    pub async fn poll_once(&self, provider_id: &ProviderId) -> AppResult<PollReport> {
        let refreshed = self.sync.refresh_issue_tasks(provider_id).await?;
        let imported = self.sync.add_new_issues_to_backlog(provider_id).await?.len();
        Ok(PollReport {
            refreshed,
            imported,
        })
    }

    /// Poll until `shutdown` flips to `true` or its sender goes away.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> AppResult<()> {
        let providers = self.sync.pollable_providers().await?;
        if providers.is_empty() {
            tracing::info!("No issue providers to poll");
            return Ok(());
        }

        tracing::info!(count = providers.len(), "Starting issue polling");

        let loops = providers
            .iter()
            .map(|(id, every)| self.poll_provider(id, *every, shutdown.clone()));
        futures::future::join_all(loops).await;

        tracing::info!("Issue polling stopped");
        Ok(())
    }

    async fn poll_provider(
        &self,
        provider_id: &ProviderId,
        every: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if *shutdown.borrow() {
            return;
        }

        tokio::select! {
            _ = sleep(self.initial_delay) => {}
            _ = shutdown.changed() => return,
        }

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once(provider_id).await {
                        Ok(report) => tracing::debug!(
                            provider = %provider_id,
                            refreshed = report.refreshed,
                            imported = report.imported,
                            "Polled issue provider"
                        ),
                        Err(e) => {
                            tracing::warn!(provider = %provider_id, "Polling failed: {}", e);
                            self.sync.report_error(&e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notify::RecordingNotifier;
    use crate::adapters::store::JsonTaskStore;
    use crate::application::sync_service::tests::{base_service, provider, sync_service};
    use crate::domain::{IssueId, Task, TaskChanges};
    use crate::ports::{ProviderError, TaskRefresh, TaskStore};

    fn linked_task() -> Task {
        let mut task = Task::new("Original");
        task.issue_provider_id = Some(ProviderId::from("yt"));
        task.issue_id = Some(IssueId::from("2-1"));
        task
    }

    #[tokio::test]
    async fn poll_once_refreshes_and_imports() {
        let mut service = base_service();
        service.expect_get_fresh_data_for_issue_tasks().returning(|tasks| {
            Ok(tasks
                .iter()
                .map(|task| TaskRefresh {
                    task: task.clone(),
                    task_changes: TaskChanges {
                        issue_was_updated: Some(true),
                        ..Default::default()
                    },
                    issue: crate::application::sync_service::tests::issue("2-1", "Original"),
                })
                .collect())
        });
        service
            .expect_get_new_issues_to_add_to_backlog()
            .returning(|_, _| {
                Ok(vec![crate::application::sync_service::tests::issue(
                    "2-9", "Backlog",
                )])
            });

        let tasks = Arc::new(JsonTaskStore::in_memory());
        tasks.add_task(linked_task()).await.unwrap();
        let sync = Arc::new(sync_service(
            service,
            vec![provider("yt")],
            tasks.clone(),
            Arc::new(RecordingNotifier::default()),
        ));

        let poller = IssuePoller::new(sync, Duration::ZERO);
        let report = poller.poll_once(&ProviderId::from("yt")).await.unwrap();

        assert_eq!(
            report,
            PollReport {
                refreshed: 1,
                imported: 1
            }
        );
        assert_eq!(tasks.list_tasks().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn run_keeps_polling_after_failures_until_shutdown() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();

        let mut service = base_service();
        service
            .expect_get_fresh_data_for_issue_tasks()
            .returning(move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err(ProviderError::Handled("Youtrack: HTTP 503".to_string()))
            });
        service
            .expect_get_new_issues_to_add_to_backlog()
            .returning(|_, _| Ok(Vec::new()));

        let tasks = Arc::new(JsonTaskStore::in_memory());
        tasks.add_task(linked_task()).await.unwrap();
        let sync = Arc::new(sync_service(
            service,
            vec![provider("yt")],
            tasks,
            Arc::new(RecordingNotifier::default()),
        ));

        let (tx, rx) = watch::channel(false);
        let poller = IssuePoller::new(sync, Duration::ZERO);
        let handle = tokio::spawn(async move { poller.run(rx).await });

        sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        tokio_test::assert_ok!(handle.await.unwrap());

        assert!(calls.load(std::sync::atomic::Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn run_without_pollable_providers_returns() {
        let mut cfg = provider("yt");
        cfg.is_auto_poll = false;
        let sync = Arc::new(sync_service(
            base_service(),
            vec![cfg],
            Arc::new(JsonTaskStore::in_memory()),
            Arc::new(RecordingNotifier::default()),
        ));

        let (_tx, rx) = watch::channel(false);
        let poller = IssuePoller::new(sync, Duration::ZERO);
        tokio_test::assert_ok!(poller.run(rx).await);
    }
}
