//! # gNXI Tester Server
//!
//! HTTP control plane for gNMI/gNOI conformance runs. Operators manage
//! prompt sets, targets and uploaded files, start a run, and poll its output
//! until it reaches a terminal state.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, Uri},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use handlers::files::MAX_UPLOAD_BYTES;
use infra::errors::AppError;

/// Assemble the application router with CORS, tracing and state.
pub fn create_app(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state);

    routes::create_api_router()
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("no route for {}", uri.path()))
}

fn build_cors_layer(state: &AppState) -> CorsLayer {
    let cors = &state.config().cors;

    let allow_origin = if cors.is_wildcard_origin() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    let allow_headers = if cors.is_wildcard_headers() {
        AllowHeaders::any()
    } else {
        let headers: Vec<HeaderName> = cors
            .allowed_headers
            .iter()
            .filter_map(|header| match HeaderName::from_bytes(header.as_bytes()) {
                Ok(name) => Some(name),
                Err(_) => {
                    warn!(%header, "ignoring invalid CORS header");
                    None
                }
            })
            .collect();
        AllowHeaders::list(headers)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers(allow_headers)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
}
