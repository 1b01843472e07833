pub mod config_store;
pub mod issue_service;
pub mod notifier;
pub mod task_store;

pub use config_store::*;
pub use issue_service::*;
pub use notifier::*;
pub use task_store::*;
