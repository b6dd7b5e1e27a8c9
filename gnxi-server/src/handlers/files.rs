use axum::{
    extract::{
        Multipart, State,
        multipart::MultipartRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use gnxi_core::{
    ResourceKind, TesterError,
    api::{ApiResponse, DeletedResponse},
};
use tracing::info;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
    extract::PathParam,
};

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Upload bodies may carry OS images.
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

pub async fn upload_file_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field.file_name().map(str::to_owned);
        let contents = field.bytes().await?;

        let stored = state
            .file_store()
            .store(original_name.as_deref(), &contents)
            .await?;
        info!(
            name = %stored.name,
            original = original_name.as_deref().unwrap_or("-"),
            size = stored.size,
            "file uploaded"
        );
        return Ok((StatusCode::CREATED, Json(ApiResponse::success(stored))));
    }

    Err(AppError::bad_request(format!(
        "multipart field '{UPLOAD_FIELD}' is required"
    )))
}

pub async fn delete_file_handler(
    State(state): State<AppState>,
    PathParam(file): PathParam<String>,
) -> AppResult<impl IntoResponse> {
    if !state.file_store().delete(&file).await? {
        return Err(TesterError::not_found(ResourceKind::File, file).into());
    }
    info!(name = %file, "file deleted");
    Ok(Json(ApiResponse::success(DeletedResponse { deleted: file })))
}
