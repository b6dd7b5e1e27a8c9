//! Route table.
//!
//! Every endpoint is one row of [`ROUTES`]; the router is built by folding
//! the table, so adding an endpoint never touches the wiring code.

use axum::{
    Router,
    routing::{MethodFilter, MethodRouter, on},
};
use gnxi_core::api::routes;

use crate::{
    AppState,
    handlers::{files, health, prompts, run, targets, tests as catalog},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn filter(self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Put => MethodFilter::PUT,
            Verb::Delete => MethodFilter::DELETE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    GetPrompts,
    ListPromptNames,
    SetPrompts,
    DeletePrompts,
    ListTargets,
    GetTarget,
    SetTarget,
    DeleteTarget,
    UploadFile,
    DeleteFile,
    StartRun,
    RunOutput,
    ListTests,
    TestOrder,
    Health,
}

impl Endpoint {
    fn method_router(self, filter: MethodFilter) -> MethodRouter<AppState> {
        match self {
            Endpoint::GetPrompts => on(filter, prompts::get_prompts_handler),
            Endpoint::ListPromptNames => {
                on(filter, prompts::list_prompt_names_handler)
            }
            Endpoint::SetPrompts => on(filter, prompts::set_prompts_handler),
            Endpoint::DeletePrompts => on(filter, prompts::delete_prompts_handler),
            Endpoint::ListTargets => on(filter, targets::list_targets_handler),
            Endpoint::GetTarget => on(filter, targets::get_target_handler),
            Endpoint::SetTarget => on(filter, targets::set_target_handler),
            Endpoint::DeleteTarget => on(filter, targets::delete_target_handler),
            Endpoint::UploadFile => on(filter, files::upload_file_handler),
            Endpoint::DeleteFile => on(filter, files::delete_file_handler),
            Endpoint::StartRun => on(filter, run::start_run_handler),
            Endpoint::RunOutput => on(filter, run::run_output_handler),
            Endpoint::ListTests => on(filter, catalog::list_tests_handler),
            Endpoint::TestOrder => on(filter, catalog::test_order_handler),
            Endpoint::Health => on(filter, health::health_handler),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub verb: Verb,
    pub path: &'static str,
    pub endpoint: Endpoint,
}

const fn route(verb: Verb, path: &'static str, endpoint: Endpoint) -> Route {
    Route {
        verb,
        path,
        endpoint,
    }
}

pub const ROUTES: &[Route] = &[
    route(Verb::Get, routes::prompts::COLLECTION, Endpoint::GetPrompts),
    route(Verb::Get, routes::prompts::LIST, Endpoint::ListPromptNames),
    route(Verb::Post, routes::prompts::COLLECTION, Endpoint::SetPrompts),
    route(Verb::Put, routes::prompts::COLLECTION, Endpoint::SetPrompts),
    route(Verb::Delete, routes::prompts::ITEM, Endpoint::DeletePrompts),
    route(Verb::Get, routes::targets::COLLECTION, Endpoint::ListTargets),
    route(Verb::Get, routes::targets::ITEM, Endpoint::GetTarget),
    route(Verb::Post, routes::targets::ITEM, Endpoint::SetTarget),
    route(Verb::Put, routes::targets::ITEM, Endpoint::SetTarget),
    route(Verb::Delete, routes::targets::ITEM, Endpoint::DeleteTarget),
    route(Verb::Post, routes::files::UPLOAD, Endpoint::UploadFile),
    route(Verb::Delete, routes::files::ITEM, Endpoint::DeleteFile),
    route(Verb::Post, routes::run::START, Endpoint::StartRun),
    route(Verb::Get, routes::run::OUTPUT, Endpoint::RunOutput),
    route(Verb::Get, routes::tests::CATALOG, Endpoint::ListTests),
    route(Verb::Get, routes::tests::ORDER, Endpoint::TestOrder),
    route(Verb::Get, routes::HEALTH, Endpoint::Health),
];

/// Build the API router from [`ROUTES`].
pub fn create_api_router() -> Router<AppState> {
    ROUTES.iter().fold(Router::new(), |router, entry| {
        router.route(entry.path, entry.endpoint.method_router(entry.verb.filter()))
    })
}
