mod json_task_store;

pub use json_task_store::JsonTaskStore;
