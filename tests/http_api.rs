//! End-to-end tests of the worker-facing HTTP surface, driven through
//! `tower::ServiceExt::oneshot` against the routed app with no real socket.

use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use row_dispatcher::config::TrackerConfig;
use row_dispatcher::server::build_router;
use row_dispatcher::tracker::DataTracker;

struct Job {
    dir: tempfile::TempDir,
    infile: PathBuf,
    outfile: PathBuf,
    checkpoint: PathBuf,
}

fn make_job(contents: &[u8]) -> Job {
    let dir = tempfile::tempdir().unwrap();
    let infile = dir.path().join("in.jsonl");
    std::fs::write(&infile, contents).unwrap();
    let outfile = dir.path().join("out.jsonl");
    let checkpoint = dir.path().join("job.checkpoint");
    Job {
        dir,
        infile,
        outfile,
        checkpoint,
    }
}

fn open_tracker(job: &Job, work_timeout: Duration) -> DataTracker {
    DataTracker::open(
        &job.infile,
        &job.outfile,
        &job.checkpoint,
        TrackerConfig {
            work_timeout,
            checkpoint_interval: Duration::from_secs(3600),
            max_batch_size: 1024,
        },
    )
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_reports_ok() {
    let job = make_job(b"A\n");
    let router = build_router(open_tracker(&job, Duration::from_secs(3600)));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_work_then_submit_result_round_trips() {
    let job = make_job(b"A\nB\n");
    let router = build_router(open_tracker(&job, Duration::from_secs(3600)));

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/get_work?batch_size=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["items"][0]["work_id"], 0);
    assert_eq!(body["items"][1]["work_id"], 1);

    let submit_body = json!({
        "items": [
            {"row_id": 0, "result": "a"},
            {"row_id": 1, "result": "b"},
        ]
    });
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/submit_result")
                .header("content-type", "application/json")
                .body(Body::from(submit_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");

    let response = router
        .oneshot(
            Request::builder()
                .uri("/get_work")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "all_work_complete");
}

#[tokio::test]
async fn submit_result_rejects_embedded_newline() {
    let job = make_job(b"A\n");
    let router = build_router(open_tracker(&job, Duration::from_secs(3600)));

    let _ = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/get_work")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let submit_body = json!({
        "items": [{"row_id": 0, "result": "line one\nline two"}]
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/submit_result")
                .header("content-type", "application/json")
                .body(Body::from(submit_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("embedded newline"));
}

#[tokio::test]
async fn get_work_returns_retry_when_input_not_yet_exhausted_but_all_issued() {
    let job = make_job(b"A\n");
    let router = build_router(open_tracker(&job, Duration::from_secs(3600)));

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/get_work")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");

    // The only line is now issued and not yet expired: a second request
    // should report `retry`, not `all_work_complete`.
    let response = router
        .oneshot(
            Request::builder()
                .uri("/get_work")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "retry");
    assert!(body["retry_in"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn status_reports_tracker_snapshot() {
    let job = make_job(b"A\nB\n");
    let router = build_router(open_tracker(&job, Duration::from_secs(3600)));

    let _ = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/get_work")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["issued"], 1);
    assert_eq!(body["input_eof"], false);
}
