//! Command-line configuration for the dispatcher server.
//!
//! Parsed with `clap`'s derive API, mirroring the reference codebase's
//! preference for declarative, typed configuration over hand-rolled
//! argument loops. `clap` already exits with status `2` and a usage message
//! on a malformed invocation, which is exactly the bad-arguments exit code
//! this server's contract specifies — nothing extra to implement there.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Resumable work dispatcher for a line-oriented input file.
#[derive(Debug, Parser)]
#[command(name = "row-dispatcherd", version, about)]
pub struct Cli {
    /// Input file: one JSON record per line.
    #[arg(long)]
    pub infile: PathBuf,

    /// Output file: one result per line, in input order.
    #[arg(long)]
    pub outfile: PathBuf,

    /// Checkpoint file path. Defaults to `<outfile>.checkpoint`.
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Address to bind the HTTP listener to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the HTTP listener to.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Seconds an issued item may go unacknowledged before it is reissued.
    #[arg(long = "work-timeout", default_value_t = 3600)]
    pub work_timeout_secs: u64,

    /// Minimum seconds between checkpoint writes.
    #[arg(long = "checkpoint-interval", default_value_t = 60)]
    pub checkpoint_interval_secs: u64,
}

impl Cli {
    /// Resolves the checkpoint path, defaulting to `<outfile>.checkpoint`.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint.clone().unwrap_or_else(|| {
            let mut path = self.outfile.clone().into_os_string();
            path.push(".checkpoint");
            PathBuf::from(path)
        })
    }

    pub fn work_timeout(&self) -> Duration {
        Duration::from_secs(self.work_timeout_secs)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }
}

/// Tunables that govern tracker behavior, independent of file locations.
///
/// Kept separate from [`Cli`] so the tracker can be constructed directly in
/// tests without going through argument parsing.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub work_timeout: Duration,
    pub checkpoint_interval: Duration,
    /// Upper bound clamp applied to a client-requested `batch_size`.
    pub max_batch_size: usize,
}

impl TrackerConfig {
    pub const DEFAULT_MAX_BATCH_SIZE: usize = 1024;
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            work_timeout: Duration::from_secs(3600),
            checkpoint_interval: Duration::from_secs(60),
            max_batch_size: Self::DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl From<&Cli> for TrackerConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            work_timeout: cli.work_timeout(),
            checkpoint_interval: cli.checkpoint_interval(),
            max_batch_size: Self::DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_defaults_to_sibling_of_outfile() {
        let cli = Cli::parse_from([
            "row-dispatcherd",
            "--infile",
            "in.jsonl",
            "--outfile",
            "out.jsonl",
        ]);
        assert_eq!(cli.checkpoint_path(), PathBuf::from("out.jsonl.checkpoint"));
    }

    #[test]
    fn explicit_checkpoint_path_is_honored() {
        let cli = Cli::parse_from([
            "row-dispatcherd",
            "--infile",
            "in.jsonl",
            "--outfile",
            "out.jsonl",
            "--checkpoint",
            "/tmp/custom.ckpt",
        ]);
        assert_eq!(cli.checkpoint_path(), PathBuf::from("/tmp/custom.ckpt"));
    }
}
