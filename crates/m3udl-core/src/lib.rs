pub mod config;
pub mod logging;

pub mod control;
pub mod fetch_head;
pub mod fetcher;
pub mod format;
pub mod naming;
pub mod playlist;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod storage;
pub mod task;

pub use task::{DownloadTask, TaskId};
