use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use gnxi_core::{
    ResourceKind, TargetDescriptor, TesterError,
    api::{ApiResponse, DeletedResponse},
};
use tracing::info;

use crate::infra::{
    app_state::AppState,
    errors::AppResult,
    extract::{JsonBody, PathParam},
};

pub async fn list_targets_handler(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let targets = state.config_store().list_targets().await?;
    Ok(Json(ApiResponse::success(targets)))
}

pub async fn get_target_handler(
    State(state): State<AppState>,
    PathParam(name): PathParam<String>,
) -> AppResult<impl IntoResponse> {
    let target = state
        .config_store()
        .get_target(&name)
        .await?
        .ok_or_else(|| TesterError::not_found(ResourceKind::Target, name))?;
    Ok(Json(ApiResponse::success(target)))
}

/// Create or replace a target. The name in the path wins over the body.
pub async fn set_target_handler(
    State(state): State<AppState>,
    PathParam(name): PathParam<String>,
    JsonBody(mut target): JsonBody<TargetDescriptor>,
) -> AppResult<impl IntoResponse> {
    target.name = name;
    state.config_store().put_target(target.clone()).await?;
    info!(name = %target.name, address = %target.address, "target saved");
    Ok(Json(ApiResponse::success(target)))
}

pub async fn delete_target_handler(
    State(state): State<AppState>,
    PathParam(name): PathParam<String>,
) -> AppResult<impl IntoResponse> {
    if !state.config_store().delete_target(&name).await? {
        return Err(TesterError::not_found(ResourceKind::Target, name).into());
    }
    info!(%name, "target deleted");
    Ok(Json(ApiResponse::success(DeletedResponse { deleted: name })))
}
