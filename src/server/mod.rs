//! HTTP surface and process lifecycle.
//!
//! Binds the listener, serves the three worker-facing endpoints plus a
//! liveness probe, and shuts down cleanly either when a signal arrives or
//! when the tracker reports all work complete — whichever happens first.
//! A background poll loop is the only thing that ever reads
//! [`crate::tracker::DataTracker::all_work_complete`] outside of a request;
//! it shares the same lock every handler uses, so there is exactly one
//! source of truth for "is this job done".

pub mod dto;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::TrackerError;
use crate::tracker::DataTracker;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Mutex<DataTracker>>,
}

/// Logs a fatal tracker error and aborts the process. Never returns.
///
/// Per the error handling design, I/O failures writing output or a
/// checkpoint are not degraded into an HTTP response: the last good
/// checkpoint is the only recovery path, so there is nothing sound left to
/// do but log and exit non-zero.
pub(crate) fn fatal(err: TrackerError) -> ! {
    tracing::error!(error = %err, "fatal tracker error, shutting down");
    std::process::exit(1);
}

/// Builds the routed app for a tracker, without binding any listener.
///
/// Exposed publicly so integration tests can drive the full request/response
/// cycle with `tower::ServiceExt::oneshot`, with no real socket involved.
pub fn build_router(tracker: DataTracker) -> Router {
    router(AppState {
        tracker: Arc::new(Mutex::new(tracker)),
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/get_work", get(handlers::get_work))
        .route("/submit_result", post(handlers::submit_result))
        .route("/status", get(handlers::status))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the server to completion: binds `host:port`, serves requests, and
/// returns once shutdown has fully drained and the tracker has been closed.
pub async fn run(tracker: DataTracker, host: &str, port: u16) -> std::io::Result<()> {
    let state = AppState {
        tracker: Arc::new(Mutex::new(tracker)),
    };

    // Bind via the `host:port` string directly rather than parsing it to a
    // `SocketAddr` first: `SocketAddr::parse` only accepts literal IPs, so a
    // documented-valid `--host localhost` would panic instead of resolving.
    // `TcpListener::bind` accepts anything implementing `ToSocketAddrs`,
    // which resolves hostnames the same way the standard library does.
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(addr.as_str()).await?;
    info!(%addr, "dispatcher listening");

    axum::serve(listener, router(state.clone()).into_make_service())
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    state.tracker.lock().close().unwrap_or_else(|err| fatal(err));
    info!("dispatcher shut down cleanly");
    Ok(())
}

/// Resolves on whichever comes first: `SIGINT`/`SIGTERM`, or the tracker
/// reporting all work complete.
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let work_complete = async {
        loop {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if state.tracker.lock().all_work_complete() {
                break;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("received interrupt signal, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
        _ = work_complete => info!("all work complete, shutting down"),
    }
}
