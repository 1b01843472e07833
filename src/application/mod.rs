pub mod error;
pub mod poller;
pub mod registry;
pub mod sync_service;

pub use error::*;
pub use poller::*;
pub use registry::*;
pub use sync_service::*;
