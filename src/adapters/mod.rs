pub mod config;
pub mod notify;
pub mod render;
pub mod store;
pub mod youtrack;
