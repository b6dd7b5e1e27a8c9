use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use gnxi_core::{
    PromptSet, ResourceKind, TesterError,
    api::{ApiResponse, DeletedResponse, NamesResponse},
};
use serde::Deserialize;
use tracing::info;

use crate::infra::{
    app_state::AppState,
    errors::AppResult,
    extract::{JsonBody, PathParam, QueryParams},
};

#[derive(Debug, Deserialize)]
pub struct PromptsQuery {
    pub name: Option<String>,
}

/// `GET /prompts`: every prompt set, or the one named by `?name=`.
pub async fn get_prompts_handler(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PromptsQuery>,
) -> AppResult<impl IntoResponse> {
    let store = state.config_store();
    let prompts = match query.name {
        Some(name) => {
            let prompts = store
                .get_prompt_set(&name)
                .await?
                .ok_or_else(|| TesterError::not_found(ResourceKind::PromptSet, name))?;
            vec![prompts]
        }
        None => store.list_prompt_sets().await?,
    };
    Ok(Json(ApiResponse::success(prompts)))
}

pub async fn list_prompt_names_handler(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let names = state
        .config_store()
        .list_prompt_sets()
        .await?
        .into_iter()
        .map(|prompts| prompts.name)
        .collect();
    Ok(Json(ApiResponse::success(NamesResponse { names })))
}

pub async fn set_prompts_handler(
    State(state): State<AppState>,
    JsonBody(prompts): JsonBody<PromptSet>,
) -> AppResult<impl IntoResponse> {
    state.config_store().put_prompt_set(prompts.clone()).await?;
    info!(name = %prompts.name, "prompt set saved");
    Ok(Json(ApiResponse::success(prompts)))
}

pub async fn delete_prompts_handler(
    State(state): State<AppState>,
    PathParam(name): PathParam<String>,
) -> AppResult<impl IntoResponse> {
    if !state.config_store().delete_prompt_set(&name).await? {
        return Err(TesterError::not_found(ResourceKind::PromptSet, name).into());
    }
    info!(%name, "prompt set deleted");
    Ok(Json(ApiResponse::success(DeletedResponse { deleted: name })))
}
