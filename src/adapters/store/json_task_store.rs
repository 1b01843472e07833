use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::{Task, TaskChanges, TaskId};
use crate::ports::{StoreError, StoreResult, TaskStore};

/// Tasks kept in memory and written back to a JSON file after every change.
pub struct JsonTaskStore {
    path: Option<PathBuf>,
    tasks: DashMap<TaskId, Task>,
    flush_lock: Mutex<()>,
}

impl JsonTaskStore {
    /// Open the default store under the user's data directory.
    pub async fn open_default() -> StoreResult<Self> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| StoreError::Read("Cannot determine data directory".to_string()))?;
        Self::open(data_dir.join("issue-bridge").join("tasks.json")).await
    }

    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let tasks = DashMap::new();

        match fs::read_to_string(&path).await {
            Ok(content) => {
                let stored: Vec<Task> =
                    serde_json::from_str(&content).map_err(|e| StoreError::Read(e.to_string()))?;
                for task in stored {
                    tasks.insert(task.id.clone(), task);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Read(e.to_string())),
        }

        tracing::debug!(path = %path.display(), count = tasks.len(), "Loaded tasks");

        Ok(Self {
            path: Some(path),
            tasks,
            flush_lock: Mutex::new(()),
        })
    }

    /// Store that never touches the disk.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tasks: DashMap::new(),
            flush_lock: Mutex::new(()),
        }
    }

    fn sorted_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.iter().map(|entry| entry.value().clone()).collect();
        tasks.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.0.cmp(&b.id.0)));
        tasks
    }

    async fn flush(&self) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.flush_lock.lock().await;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Write(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(&self.sorted_tasks())
            .map_err(|e| StoreError::Write(e.to_string()))?;
        fs::write(path, content)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(self.sorted_tasks())
    }

    async fn get_task(&self, id: &TaskId) -> StoreResult<Task> {
        self.tasks
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn add_task(&self, task: Task) -> StoreResult<Task> {
        self.tasks.insert(task.id.clone(), task.clone());
        self.flush().await?;
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, changes: &TaskChanges) -> StoreResult<Task> {
        let updated = {
            let mut entry = self
                .tasks
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            changes.apply(entry.value_mut());
            entry.value().clone()
        };
        self.flush().await?;
        Ok(updated)
    }
}
