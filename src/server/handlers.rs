//! Request handlers: translate HTTP calls into tracker operations.
//!
//! Handlers never surface tracker internals to a client. A fatal tracker
//! error (I/O failure writing output or a checkpoint) is not turned into an
//! HTTP error response at all — it propagates to [`super::fatal`], which
//! logs it and shuts the process down; the last good checkpoint is the
//! recovery point. The only client-visible failure mode here is `400` for a
//! malformed request body.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::dto::{
    GetWorkQuery, GetWorkResponse, SubmitResultRequest, SubmitResultResponse, WorkItemDto,
};
use super::AppState;
use crate::tracker::TrackerStatus;

/// Surfaced only as a `400`; never includes tracker internals.
pub struct ApiError(String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body {
            error: String,
        }
        (StatusCode::BAD_REQUEST, Json(Body { error: self.0 })).into_response()
    }
}

pub async fn get_work(
    State(state): State<AppState>,
    Query(query): Query<GetWorkQuery>,
) -> Json<GetWorkResponse> {
    let batch_size = query.batch_size.unwrap_or(1);

    let mut tracker = state.tracker.lock();
    let batch = tracker
        .get_work_batch(batch_size)
        .unwrap_or_else(|err| super::fatal(err));

    let response = match batch {
        Some(items) => GetWorkResponse::Ok {
            items: items.into_iter().map(WorkItemDto::from).collect(),
        },
        None if tracker.all_work_complete() => GetWorkResponse::AllWorkComplete,
        None => {
            let retry_in = tracker.retry_hint().as_secs().max(1);
            GetWorkResponse::Retry { retry_in }
        }
    };
    drop(tracker);
    Json(response)
}

pub async fn submit_result(
    State(state): State<AppState>,
    Json(body): Json<SubmitResultRequest>,
) -> Result<Json<SubmitResultResponse>, ApiError> {
    let mut results = Vec::with_capacity(body.items.len());
    for item in body.items {
        if item.result.contains('\n') {
            return Err(ApiError(format!(
                "result for row_id {} contains an embedded newline",
                item.row_id
            )));
        }
        results.push((item.row_id, item.result.into_bytes()));
    }

    let mut tracker = state.tracker.lock();
    tracker
        .complete_work_batch(results)
        .unwrap_or_else(|err| super::fatal(err));
    drop(tracker);

    Ok(Json(SubmitResultResponse::OK))
}

pub async fn status(State(state): State<AppState>) -> Json<TrackerStatus> {
    Json(state.tracker.lock().status())
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
