//! JSON request/response shapes for the three worker-facing endpoints.
//!
//! These are deliberately thin: they exist to frame the wire format, not to
//! carry behavior. The tracker never sees these types directly — handlers
//! translate to and from [`crate::input_reader::WorkItem`] and plain
//! `(u64, Vec<u8>)` tuples at the boundary.

use serde::{Deserialize, Serialize};

use crate::input_reader::WorkItem;

#[derive(Debug, Deserialize)]
pub struct GetWorkQuery {
    pub batch_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct WorkItemDto {
    pub work_id: u64,
    pub row_content: String,
}

impl From<WorkItem> for WorkItemDto {
    fn from(item: WorkItem) -> Self {
        Self {
            work_id: item.work_id,
            row_content: String::from_utf8_lossy(&item.content).into_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum GetWorkResponse {
    #[serde(rename = "OK")]
    Ok { items: Vec<WorkItemDto> },
    #[serde(rename = "retry")]
    Retry { retry_in: u64 },
    #[serde(rename = "all_work_complete")]
    AllWorkComplete,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResultRequest {
    pub items: Vec<SubmitResultItem>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResultItem {
    pub row_id: u64,
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResultResponse {
    pub status: &'static str,
}

impl SubmitResultResponse {
    pub const OK: Self = Self { status: "OK" };
}
