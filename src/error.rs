//! Error types for the dispatcher.
//!
//! Two small hierarchies, split by when they can occur:
//!
//! - [`StartupError`] — raised while loading a checkpoint and opening the
//!   input/output files, before the server starts accepting requests.
//! - [`TrackerError`] — raised by the [`crate::tracker::DataTracker`] while
//!   serving requests; these are fatal by construction (see §7 of the
//!   design: I/O errors writing output or a checkpoint are never degraded
//!   to a client-visible response, they abort the process).
//!
//! Neither type is ever serialized back to an HTTP client: the request
//! handlers translate tracker failures into a process shutdown, and
//! client-facing problems (bad bodies, embedded newlines, unknown ids) are
//! reported with a plain `400` that carries no internal detail.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can abort the server before it starts serving requests.
#[derive(Debug, Error, Diagnostic)]
pub enum StartupError {
    /// The checkpoint file's `input_offset` points past the end of the
    /// input file, or the checkpoint claims progress the output file does
    /// not have.
    #[error("checkpoint is inconsistent with {path}: {reason}")]
    #[diagnostic(
        code(row_dispatcher::startup::checkpoint_inconsistent),
        help(
            "the checkpoint at --checkpoint no longer matches --infile/--outfile; \
             restore the matching input/output pair or delete the checkpoint to start fresh"
        )
    )]
    CheckpointInconsistent { path: PathBuf, reason: String },

    /// Failed to open or read one of the job's files.
    #[error("failed to open {path}: {source}")]
    #[diagnostic(code(row_dispatcher::startup::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while the tracker is serving requests.
///
/// Every variant here is fatal: on receipt, the server logs the last known
/// `last_processed_work_id` and shuts down. The last successful checkpoint
/// is the recovery point.
#[derive(Debug, Error, Diagnostic)]
pub enum TrackerError {
    /// Writing to the output file failed.
    #[error("failed to append to output file: {0}")]
    #[diagnostic(code(row_dispatcher::tracker::output_io))]
    OutputIo(#[source] std::io::Error),

    /// Writing or renaming the checkpoint failed.
    #[error("failed to persist checkpoint: {0}")]
    #[diagnostic(code(row_dispatcher::tracker::checkpoint_io))]
    CheckpointIo(#[source] std::io::Error),

    /// Reading the next line from the input file failed.
    #[error("failed to read input file: {0}")]
    #[diagnostic(code(row_dispatcher::tracker::input_io))]
    InputIo(#[source] std::io::Error),
}

pub type StartupResult<T> = std::result::Result<T, StartupError>;
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;
