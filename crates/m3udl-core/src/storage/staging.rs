//! Sequential writer for a task's staging file.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// How a transfer uses the existing staging file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Append to the staging file, requesting bytes from `offset` onward.
    Resume { offset: u64 },
    /// Truncate the staging file and fetch from byte zero.
    Restart,
}

impl ResumePlan {
    /// Resume only when the server supports ranges, the size is known, and
    /// the partial file is non-empty and strictly smaller than the total.
    pub fn choose(local_size: u64, total_size: u64, accept_ranges: bool) -> Self {
        if accept_ranges && total_size > 0 && local_size > 0 && local_size < total_size {
            ResumePlan::Resume { offset: local_size }
        } else {
            ResumePlan::Restart
        }
    }

    pub fn offset(self) -> u64 {
        match self {
            ResumePlan::Resume { offset } => offset,
            ResumePlan::Restart => 0,
        }
    }
}

/// Open staging file plus the number of bytes it currently holds.
#[derive(Debug)]
pub struct StagingFile {
    file: File,
    path: PathBuf,
    len: u64,
}

impl StagingFile {
    /// Makes sure the staging file exists (creating parent directories and an
    /// empty file if needed) and returns its current size.
    pub fn ensure_exists(path: &Path) -> io::Result<u64> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::options().create(true).append(true).open(path)?;
        Ok(file.metadata()?.len())
    }

    /// Opens the staging file for `plan`: append for resume, truncate for restart.
    pub fn open(path: &Path, plan: ResumePlan) -> io::Result<Self> {
        let (file, len) = match plan {
            ResumePlan::Resume { offset } => {
                let file = File::options().create(true).append(true).open(path)?;
                let len = file.metadata()?.len();
                if len != offset {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "staging file {} changed size: expected {}, found {}",
                            path.display(),
                            offset,
                            len
                        ),
                    ));
                }
                (file, len)
            }
            ResumePlan::Restart => {
                let file = File::options()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)?;
                (file, 0)
            }
        };
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)?;
        self.len += data.len() as u64;
        Ok(())
    }

    /// Discards everything written so far (server ignored the range request).
    pub fn restart(&mut self) -> io::Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.len = 0;
        Ok(())
    }

    /// Bytes currently in the staging file.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush to disk and close, returning the staging path.
    pub fn close(self) -> io::Result<PathBuf> {
        self.file.sync_all()?;
        Ok(self.path)
    }
}
