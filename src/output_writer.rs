//! Append-only writer over the output file.
//!
//! The writer owns no ordering logic of its own — [`crate::tracker::DataTracker`]
//! guarantees [`OutputWriter::append`] is only ever called with the next
//! contiguous run of results, so that output line `i` always corresponds to
//! input line `i`. Each call flushes to the OS buffer but does **not**
//! `fsync`; only the checkpoint is fsynced (see [`crate::checkpoint`]), so a
//! crash between a write and the next checkpoint can lose already-written
//! lines from the OS page cache. Resuming from the checkpoint is safe
//! regardless, because the checkpoint is always conservative: it never
//! claims more progress than the output file actually holds.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{StartupError, StartupResult, TrackerError, TrackerResult};

pub struct OutputWriter {
    path: PathBuf,
    file: File,
    offset: u64,
}

impl OutputWriter {
    /// Opens `path` in append mode, creating it if absent. If the file
    /// already exists but is shorter than `expected_offset` (the output
    /// offset recorded in a loaded checkpoint), the output file has been
    /// truncated or lost writes since the checkpoint was taken and startup
    /// fails fatally rather than silently re-writing history.
    pub fn open(path: &Path, expected_offset: u64) -> StartupResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StartupError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let actual_len = file
            .metadata()
            .map_err(|source| StartupError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if actual_len < expected_offset {
            return Err(StartupError::CheckpointInconsistent {
                path: path.to_path_buf(),
                reason: format!(
                    "output file is {actual_len} bytes but checkpoint expects at least {expected_offset}"
                ),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: actual_len,
        })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `lines` (each terminated by a single `\n`) in one combined
    /// write and flushes to the OS buffer.
    pub fn append(&mut self, lines: &[Vec<u8>]) -> TrackerResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            buf.extend_from_slice(line);
            buf.push(b'\n');
        }
        self.file.write_all(&buf).map_err(TrackerError::OutputIo)?;
        self.file.flush().map_err(TrackerError::OutputIo)?;
        self.offset += buf.len() as u64;
        Ok(())
    }
}
