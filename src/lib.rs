//! # row-dispatcher: resumable work dispatch for line-oriented batch jobs
//!
//! `row-dispatcher` hands the lines of a large input file out to a pool of
//! distributed workers, collects one result per line, and writes those
//! results back to an output file in the same order as the input —
//! regardless of the order workers actually finish in.
//!
//! ## Core Concepts
//!
//! - **Work item**: one line of the input file, identified by its
//!   zero-based index ([`input_reader::WorkItem`]).
//! - **Issuance**: handing a work item to a worker with an expiry deadline;
//!   an unacknowledged issuance is reissued after it expires.
//! - **Data tracker**: the single state machine that owns issuance,
//!   out-of-order buffering, flushing, and checkpointing
//!   ([`tracker::DataTracker`]).
//! - **Checkpoint**: an atomic, fsynced snapshot of tracker progress that
//!   makes the whole job resumable after a crash or restart
//!   ([`checkpoint::CheckpointStore`]).
//!
//! ## Quick Start
//!
//! ```no_run
//! use row_dispatcher::config::TrackerConfig;
//! use row_dispatcher::tracker::DataTracker;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tracker = DataTracker::open(
//!     Path::new("input.jsonl"),
//!     Path::new("output.jsonl"),
//!     Path::new("output.jsonl.checkpoint"),
//!     TrackerConfig::default(),
//! )?;
//!
//! if let Some(batch) = tracker.get_work_batch(1)? {
//!     let item = &batch[0];
//!     tracker.complete_work_batch(vec![(item.work_id, b"result".to_vec())])?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The HTTP surface in [`server`] wraps a [`tracker::DataTracker`] behind a
//! single lock and exposes it as `get_work`/`submit_result`/`status` over
//! Axum; see the `row-dispatcherd` binary for how the pieces are wired
//! together end to end.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod input_reader;
pub mod output_writer;
pub mod server;
pub mod tracker;
