use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use gnxi_core::{
    RunId, RunRequest,
    api::{ApiResponse, RunOutputResponse},
};
use serde::Deserialize;

use crate::infra::{
    app_state::AppState,
    errors::AppResult,
    extract::{JsonBody, QueryParams},
};

/// Admit a run and return immediately; progress is read from `/run/output`.
pub async fn start_run_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RunRequest>,
) -> AppResult<impl IntoResponse> {
    let accepted = state.run_control().start_run(request).await?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(accepted))))
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputQuery {
    #[serde(default)]
    pub offset: usize,
    pub run: Option<RunId>,
}

pub async fn run_output_handler(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<OutputQuery>,
) -> AppResult<impl IntoResponse> {
    let poll = state.run_control().poll_output(query.run, query.offset);
    Ok(Json(ApiResponse::success(RunOutputResponse::from(poll))))
}
