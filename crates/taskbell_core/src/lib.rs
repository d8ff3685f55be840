pub mod alarm;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod prompt;
pub mod reminder;
pub mod render;
pub mod storage;
pub mod task_api;
