//! Binary entry point: parse CLI, load the checkpoint, open the tracker,
//! then serve until all work is complete or a shutdown signal arrives.
//!
//! Start order follows the server lifecycle design exactly: load checkpoint
//! → open input/output → initialize tracker → bind listener → accept
//! requests. A fatal error at any step before the listener binds exits `1`
//! with a logged reason; `clap` itself exits `2` on a malformed invocation.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use row_dispatcher::config::{Cli, TrackerConfig};
use row_dispatcher::tracker::DataTracker;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let checkpoint_path = cli.checkpoint_path();
    let config = TrackerConfig::from(&cli);

    let tracker = match DataTracker::open(&cli.infile, &cli.outfile, &checkpoint_path, config) {
        Ok(tracker) => tracker,
        Err(err) => {
            tracing::error!(error = %err, "failed to start up");
            return std::process::ExitCode::from(1);
        }
    };

    if let Err(err) = row_dispatcher::server::run(tracker, &cli.host, cli.port).await {
        tracing::error!(error = %err, "server exited with an error");
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::SUCCESS
}
