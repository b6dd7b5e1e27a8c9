use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use gnxi_core::api::{ApiResponse, HealthResponse};

use crate::infra::app_state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        run_state: state.run_control().status().state,
        catalog_tests: state.catalog().len(),
    }))
}
