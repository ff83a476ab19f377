//! Crash-safe checkpoint persistence.
//!
//! A checkpoint is a tiny JSON file recording exactly enough to resume:
//! the highest work id durably flushed, and the matching input/output byte
//! offsets. It is written with the standard write-temp-then-rename
//! sequence (fsync the temp file, then rename over the real path), which is
//! atomic on POSIX filesystems — readers of the checkpoint path never see a
//! partially written file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

/// Durable snapshot of tracker progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// `-1` before any output line has ever been written.
    pub last_processed_work_id: i64,
    pub input_offset: u64,
    pub output_offset: u64,
}

impl CheckpointRecord {
    pub const FRESH: Self = Self {
        last_processed_work_id: -1,
        input_offset: 0,
        output_offset: 0,
    };
}

/// Reads and writes [`CheckpointRecord`]s atomically at a fixed path.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if a file exists at the checkpoint path, regardless of whether
    /// it parses. Used to distinguish "never ran" from "ran, but the
    /// checkpoint is now empty or corrupt" — the latter is only a fresh
    /// start if the output file is also empty; otherwise it's fatal.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns the stored record, or `None` if the file is absent or does
    /// not parse as a checkpoint (both are treated as a fresh start, per
    /// the checkpoint format contract — this method never fails).
    pub fn load(&self) -> Option<CheckpointRecord> {
        let bytes = fs::read(&self.path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Serializes `record`, fsyncs the temp file, then renames it over the
    /// checkpoint path.
    pub fn write(&self, record: CheckpointRecord) -> TrackerResult<()> {
        let tmp_path = self.tmp_path();
        let json = serde_json::to_vec(&record).expect("CheckpointRecord always serializes");

        let mut tmp = File::create(&tmp_path).map_err(TrackerError::CheckpointIo)?;
        tmp.write_all(&json).map_err(TrackerError::CheckpointIo)?;
        tmp.sync_all().map_err(TrackerError::CheckpointIo)?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).map_err(TrackerError::CheckpointIo)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
