//! The data tracker: the dispatcher's single state machine.
//!
//! `DataTracker` owns every mutable structure the job touches — the issued
//! map, the expiration heap, the out-of-order write buffer, and both open
//! file handles — and every operation below is meant to be called with the
//! tracker behind one lock (see [`crate::server`], which wraps it in a
//! `parking_lot::Mutex`). None of these methods suspend: all I/O here is a
//! single local read or a single local write, never a network call, which
//! is what makes holding that lock across a request cheap.

mod heap;

use std::path::Path;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::checkpoint::{CheckpointRecord, CheckpointStore};
use crate::config::TrackerConfig;
use crate::error::{StartupError, StartupResult, TrackerResult};
use crate::input_reader::{InputReader, WorkItem};
use crate::output_writer::OutputWriter;

use heap::{ExpiryHeap, Issued};

/// Best-effort check for whether the output file already holds data. Used
/// only to decide whether a present-but-unreadable checkpoint is a fresh
/// start (no output written yet) or a fatal inconsistency (output exists
/// but its checkpoint does not); a missing or inaccessible output file reads
/// as "no data", consistent with [`crate::output_writer::OutputWriter::open`]
/// creating it fresh.
fn output_file_has_data(outfile: &Path) -> bool {
    std::fs::metadata(outfile)
        .map(|metadata| metadata.len() > 0)
        .unwrap_or(false)
}

/// Snapshot of tracker state for the `/status` endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrackerStatus {
    pub issued: usize,
    pub pending_write: usize,
    pub last_processed_work_id: i64,
    pub expired_reissues: u64,
    pub input_eof: bool,
}

pub struct DataTracker {
    input: InputReader,
    output: OutputWriter,
    checkpoint: CheckpointStore,
    config: TrackerConfig,

    issued: FxHashMap<u64, Issued>,
    heap: ExpiryHeap,
    pending_write: FxHashMap<u64, Vec<u8>>,
    last_processed_work_id: i64,

    /// Byte offset in the input file immediately after the line identified
    /// by each still-outstanding `work_id` (recorded the moment that line is
    /// first read, regardless of later reissues). Entries are removed as
    /// soon as their line is flushed. This is what gets checkpointed, *not*
    /// `input.offset()` — the reader routinely reads ahead of
    /// `last_processed_work_id` (it hands out a whole batch before any of it
    /// is completed), so its raw offset corresponds to `next_work_id`, not
    /// to `last_processed_work_id + 1`.
    line_end_offsets: FxHashMap<u64, u64>,
    /// Input byte offset corresponding to `last_processed_work_id + 1`: the
    /// value actually safe to checkpoint and resume from.
    last_processed_input_offset: u64,

    last_checkpoint_at: Instant,
    expired_reissues: u64,
}

impl DataTracker {
    /// Loads (or starts fresh from) the checkpoint at `checkpoint_path`,
    /// opens the input and output files consistently with it, and builds a
    /// tracker ready to serve `get_work`/`submit_result` requests.
    pub fn open(
        infile: &Path,
        outfile: &Path,
        checkpoint_path: &Path,
        config: TrackerConfig,
    ) -> StartupResult<Self> {
        let checkpoint = CheckpointStore::new(checkpoint_path.to_path_buf());
        let record = match checkpoint.load() {
            Some(record) => record,
            None if checkpoint.exists() && output_file_has_data(outfile) => {
                return Err(StartupError::CheckpointInconsistent {
                    path: checkpoint_path.to_path_buf(),
                    reason: "checkpoint file is present but empty or unreadable, \
                             while the output file already contains data"
                        .to_string(),
                });
            }
            None => CheckpointRecord::FRESH,
        };

        let next_work_id = (record.last_processed_work_id + 1) as u64;
        let input = InputReader::open(infile, record.input_offset, next_work_id)?;
        let output = OutputWriter::open(outfile, record.output_offset)?;

        info!(
            last_processed_work_id = record.last_processed_work_id,
            input_offset = record.input_offset,
            output_offset = record.output_offset,
            "tracker resumed from checkpoint"
        );

        Ok(Self {
            input,
            output,
            checkpoint,
            config,
            issued: FxHashMap::default(),
            heap: ExpiryHeap::new(),
            pending_write: FxHashMap::default(),
            last_processed_work_id: record.last_processed_work_id,
            line_end_offsets: FxHashMap::default(),
            last_processed_input_offset: record.input_offset,
            last_checkpoint_at: Instant::now(),
            expired_reissues: 0,
        })
    }

    /// Returns up to `n` items: expired reissues first, then fresh lines
    /// from the input file. `None` means nothing is available right now
    /// (the caller should check [`DataTracker::all_work_complete`] to
    /// decide between a `retry` and an `all_work_complete` response).
    pub fn get_work_batch(&mut self, n: usize) -> TrackerResult<Option<Vec<WorkItem>>> {
        let n = n.max(1).min(self.config.max_batch_size);
        let now = Instant::now();
        let mut batch = Vec::with_capacity(n);

        // 1. Expired reissues first.
        while batch.len() < n {
            let Some((expires_at, work_id)) = self.heap.pop_live(&self.issued) else {
                break;
            };
            if expires_at > now {
                self.heap.push(expires_at, work_id); // not due yet, put it back
                break;
            }
            let content = self.issued.remove(&work_id).expect("live entry").content;
            let fresh_expiry = now + self.config.work_timeout;
            self.issued.insert(
                work_id,
                Issued {
                    expires_at: fresh_expiry,
                    content: content.clone(),
                },
            );
            self.heap.push(fresh_expiry, work_id);
            self.expired_reissues += 1;
            warn!(work_id, "reissuing expired work item");
            batch.push(WorkItem { work_id, content });
        }

        // 2. New items next.
        while batch.len() < n {
            match self.input.next_line()? {
                Some(item) => {
                    let expires_at = now + self.config.work_timeout;
                    self.issued.insert(
                        item.work_id,
                        Issued {
                            expires_at,
                            content: item.content.clone(),
                        },
                    );
                    self.heap.push(expires_at, item.work_id);
                    // Record where this line ends now, while it's fresh off
                    // the reader — by the time it's flushed the reader may be
                    // many lines further along, so `input.offset()` at flush
                    // time would be the wrong value to checkpoint.
                    self.line_end_offsets.insert(item.work_id, self.input.offset());
                    batch.push(item);
                }
                None => break,
            }
        }

        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    /// Applies a batch of completions, then flushes any now-contiguous
    /// prefix and checkpoints if the interval has elapsed.
    pub fn complete_work_batch(&mut self, results: Vec<(u64, Vec<u8>)>) -> TrackerResult<()> {
        for (work_id, bytes) in results {
            if work_id as i64 <= self.last_processed_work_id {
                continue; // duplicate, already flushed
            }
            if !self.issued.contains_key(&work_id) {
                continue; // never issued, or already completed this round
            }
            self.issued.remove(&work_id); // heap entry becomes stale implicitly
            self.pending_write.insert(work_id, bytes);
        }

        self.flush()?;
        self.maybe_checkpoint()?;
        Ok(())
    }

    /// True once the input is exhausted and nothing is in flight or
    /// buffered awaiting a flush.
    pub fn all_work_complete(&self) -> bool {
        self.input.is_eof() && self.issued.is_empty() && self.pending_write.is_empty()
    }

    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            issued: self.issued.len(),
            pending_write: self.pending_write.len(),
            last_processed_work_id: self.last_processed_work_id,
            expired_reissues: self.expired_reissues,
            input_eof: self.input.is_eof(),
        }
    }

    /// A hint for how long a client with no available work should wait
    /// before retrying: the soonest live expiration if one exists, else a
    /// small constant.
    pub fn retry_hint(&mut self) -> Duration {
        const DEFAULT_RETRY: Duration = Duration::from_secs(5);
        const MAX_RETRY: Duration = Duration::from_secs(30);

        match self.heap.peek_live(&self.issued) {
            Some((expires_at, _)) => {
                let now = Instant::now();
                if expires_at <= now {
                    Duration::from_secs(1)
                } else {
                    (expires_at - now).min(MAX_RETRY).max(Duration::from_secs(1))
                }
            }
            None => DEFAULT_RETRY,
        }
    }

    /// Final flush and checkpoint, called once on clean shutdown.
    pub fn close(&mut self) -> TrackerResult<()> {
        self.flush()?;
        self.write_checkpoint()?;
        Ok(())
    }

    /// Appends the longest contiguous run starting at
    /// `last_processed_work_id + 1` that is present in `pending_write`.
    fn flush(&mut self) -> TrackerResult<()> {
        let mut run = Vec::new();
        let mut id = self.last_processed_work_id + 1;
        let mut input_offset = self.last_processed_input_offset;
        while let Some(bytes) = self.pending_write.remove(&(id as u64)) {
            run.push(bytes);
            input_offset = self
                .line_end_offsets
                .remove(&(id as u64))
                .expect("line offset recorded when this id was first issued");
            id += 1;
        }
        if run.is_empty() {
            return Ok(());
        }
        self.output.append(&run)?;
        self.last_processed_work_id = id - 1;
        self.last_processed_input_offset = input_offset;
        Ok(())
    }

    fn maybe_checkpoint(&mut self) -> TrackerResult<()> {
        if self.last_checkpoint_at.elapsed() >= self.config.checkpoint_interval {
            self.write_checkpoint()?;
        }
        Ok(())
    }

    fn write_checkpoint(&mut self) -> TrackerResult<()> {
        let record = CheckpointRecord {
            last_processed_work_id: self.last_processed_work_id,
            input_offset: self.last_processed_input_offset,
            output_offset: self.output.offset(),
        };
        self.checkpoint.write(record)?;
        self.last_checkpoint_at = Instant::now();
        info!(
            last_processed_work_id = record.last_processed_work_id,
            input_offset = record.input_offset,
            output_offset = record.output_offset,
            "checkpoint written"
        );
        Ok(())
    }
}
