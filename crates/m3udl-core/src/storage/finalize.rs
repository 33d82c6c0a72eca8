//! Move a completed staging file onto its target path.

use std::io;
use std::path::{Path, PathBuf};

/// Replaces whatever is at `target` with the file at `staging`.
///
/// On Unix `rename(2)` swaps the destination atomically. Elsewhere the
/// existing target is removed first, leaving a window in which `target` is
/// absent. Across filesystems the staging file is copied next to the target
/// and renamed from there.
pub fn finalize(staging: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    match replace(staging, target) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(
                staging = %staging.display(),
                target = %target.display(),
                "staging dir on another filesystem; copying"
            );
            let sibling = sibling_temp(target);
            std::fs::copy(staging, &sibling)?;
            if let Err(e) = replace(&sibling, target) {
                let _ = std::fs::remove_file(&sibling);
                return Err(e);
            }
            std::fs::remove_file(staging)
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn replace(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::rename(from, to)
}

#[cfg(not(unix))]
fn replace(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        std::fs::remove_file(to)?;
    }
    std::fs::rename(from, to)
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(not(unix))]
fn is_cross_device(_e: &io::Error) -> bool {
    false
}

fn sibling_temp(target: &Path) -> PathBuf {
    let mut o = target.as_os_str().to_owned();
    o.push(".m3udl-tmp");
    PathBuf::from(o)
}
