//! YouTrack issue provider.
//!
//! Talks to the YouTrack REST API (`/api/...`) with a permanent token and
//! maps its issues onto the generic [`IssueService`](crate::ports::IssueService)
//! contract.

mod client;
mod content;
mod form;
mod service;
#[cfg(test)]
mod test_support;

pub use client::YoutrackClient;
pub use content::youtrack_issue_content;
pub use form::{validate_youtrack_cfg, YOUTRACK_CONFIG_FORM};
pub use service::YoutrackIssueService;

use std::time::Duration;

use crate::domain::IssueProvider;

pub const YOUTRACK_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Query used to find backlog candidates when the provider has no pinned search.
pub const DEFAULT_BACKLOG_QUERY: &str = "#Unresolved for: me";

pub fn is_youtrack_enabled(provider: &IssueProvider) -> bool {
    provider.is_enabled
        && provider
            .youtrack()
            .map(|cfg| cfg.has_server())
            .unwrap_or(false)
}
