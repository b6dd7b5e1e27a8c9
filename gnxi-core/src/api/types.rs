use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::run::{OutputPoll, RunId, RunState, TestResult};

/// Success envelope. Errors render as `{"error": {"message", "status"}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAcceptedResponse {
    pub run_id: RunId,
    pub state: RunState,
    pub tests: Vec<String>,
}

/// Body of `GET /run/output`: the status snapshot plus the next slice of
/// output lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutputResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Vec<TestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub lines: Vec<String>,
    pub next_offset: usize,
}

impl From<OutputPoll> for RunOutputResponse {
    fn from(poll: OutputPoll) -> Self {
        let OutputPoll { status, output } = poll;
        let record = status.record;
        Self {
            run_id: record.as_ref().map(|record| record.id),
            state: status.state,
            target: record
                .as_ref()
                .map(|record| record.spec.target.name.clone()),
            started_at: record.as_ref().map(|record| record.started_at),
            ended_at: record.as_ref().and_then(|record| record.ended_at),
            failure: record.as_ref().and_then(|record| record.failure.clone()),
            results: record.map(|record| record.results).unwrap_or_default(),
            lines: output.lines,
            next_offset: output.next_offset,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamesResponse {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub run_state: RunState,
    pub catalog_tests: usize,
}
