use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use gnxi_core::api::ApiResponse;

use crate::infra::app_state::AppState;

/// Catalog grouped by suite.
pub async fn list_tests_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.catalog().suites()))
}

pub async fn test_order_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.catalog().order()))
}
