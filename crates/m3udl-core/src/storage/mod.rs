//! Staging files and finalization.
//!
//! Incomplete downloads live in a side staging directory as `<name>.part`.
//! A staging file is opened either for append (resume) or truncated
//! (restart), and moved onto the target path once the transfer completes.

mod finalize;
mod staging;

pub use finalize::finalize;
pub use staging::{ResumePlan, StagingFile};

use std::path::{Path, PathBuf};

/// Suffix marking an incomplete download.
pub const PART_SUFFIX: &str = ".part";

/// Staging path for `file_name`: `<staging_dir>/<file_name>.part`.
pub fn staging_path(staging_dir: &Path, file_name: &str) -> PathBuf {
    staging_dir.join(format!("{file_name}{PART_SUFFIX}"))
}

/// Size of the file at `path`, or `None` if it does not exist.
pub fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().filter(|m| m.is_file()).map(|m| m.len())
}
