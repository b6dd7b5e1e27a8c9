//! API-facing facade (route paths and the response envelope).

pub mod routes;
pub mod types;

pub use types::{
    ApiResponse, DeletedResponse, HealthResponse, NamesResponse,
    RunAcceptedResponse, RunOutputResponse,
};
