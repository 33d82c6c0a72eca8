//! Download task: one URL-to-file unit with a stable id.

use std::path::{Path, PathBuf};

use crate::storage;

/// Stable task identifier. Used for display ordering and as the progress key.
pub type TaskId = u64;

/// Immutable description of one download. Created once per batch, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub id: TaskId,
    pub url: String,
    /// Final destination.
    pub target_path: PathBuf,
    /// Partial file location while the transfer is incomplete.
    pub staging_path: PathBuf,
}

impl DownloadTask {
    /// Builds a task whose staging file lives in `staging_dir` under the
    /// target's file name plus the partial suffix.
    pub fn new(id: TaskId, url: impl Into<String>, target_path: PathBuf, staging_dir: &Path) -> Self {
        let file_name = target_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("task-{id}"));
        let staging_path = storage::staging_path(staging_dir, &file_name);
        Self {
            id,
            url: url.into(),
            target_path,
            staging_path,
        }
    }

    /// Name shown in the progress panel (the target's file name).
    pub fn display_name(&self) -> String {
        self.target_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.url.clone())
    }
}
