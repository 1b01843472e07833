use std::collections::HashMap;
use std::sync::Arc;

use super::{AppError, AppResult};
use crate::domain::IssueProviderKey;
use crate::ports::IssueService;

/// Maps provider keys to their service implementation.
#[derive(Default, Clone)]
pub struct IssueServiceRegistry {
    services: HashMap<IssueProviderKey, Arc<dyn IssueService>>,
}

impl IssueServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: Arc<dyn IssueService>) {
        let key = service.key();
        if self.services.insert(key, service).is_some() {
            tracing::warn!("Replacing issue service for {}", key);
        }
    }

    pub fn with(mut self, service: Arc<dyn IssueService>) -> Self {
        self.register(service);
        self
    }

    pub fn get(&self, key: IssueProviderKey) -> AppResult<Arc<dyn IssueService>> {
        self.services
            .get(&key)
            .cloned()
            .ok_or(AppError::UnsupportedProvider(key))
    }

    pub fn keys(&self) -> Vec<IssueProviderKey> {
        IssueProviderKey::ALL
            .into_iter()
            .filter(|key| self.services.contains_key(key))
            .collect()
    }
}
