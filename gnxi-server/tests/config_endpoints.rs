use anyhow::Result;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use axum_test::multipart::{MultipartForm, Part};
use gnxi_core::api::routes;
use gnxi_server::create_app;
use serde_json::{Value, json};
use tower::ServiceExt;

#[path = "support/mod.rs"]
mod support;
use support::{ScriptedEngine, build_test_app};

#[tokio::test]
async fn prompt_sets_round_trip_through_the_api() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;
    let server = &app.server;

    server
        .post(routes::prompts::COLLECTION)
        .json(&json!({ "name": "lab", "prompts": { "hostname": "dut-1" } }))
        .await
        .assert_status_ok();
    server
        .put(routes::prompts::COLLECTION)
        .json(&json!({ "name": "edge", "prompts": {}, "files": { "os_file": "abc.bin" } }))
        .await
        .assert_status_ok();

    let names: Value = server.get(routes::prompts::LIST).await.json();
    assert_eq!(names["data"]["names"], json!(["edge", "lab"]));

    let one: Value = server
        .get(routes::prompts::COLLECTION)
        .add_query_param("name", "lab")
        .await
        .json();
    assert_eq!(one["data"][0]["prompts"]["hostname"], "dut-1");

    server
        .get(routes::prompts::COLLECTION)
        .add_query_param("name", "nope")
        .await
        .assert_status_not_found();

    server
        .delete("/prompts/lab")
        .await
        .assert_status_ok();
    server
        .delete("/prompts/lab")
        .await
        .assert_status_not_found();

    let all: Value = server.get(routes::prompts::COLLECTION).await.json();
    assert_eq!(all["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn invalid_prompt_set_name_is_a_bad_request() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;

    let response = app
        .server
        .post(routes::prompts::COLLECTION)
        .json(&json!({ "name": "" }))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"]["status"], 400);
    Ok(())
}

#[tokio::test]
async fn targets_are_keyed_by_path_name() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;
    let server = &app.server;

    let saved: Value = server
        .put("/target/dut")
        .json(&json!({ "name": "ignored", "address": "10.0.0.1:9339" }))
        .await
        .json();
    assert_eq!(saved["data"]["name"], "dut");

    server
        .post("/target/bad")
        .json(&json!({ "address": "no-port" }))
        .await
        .assert_status_bad_request();

    let all: Value = server.get(routes::targets::COLLECTION).await.json();
    assert_eq!(all["data"]["dut"]["address"], "10.0.0.1:9339");
    assert!(all["data"].get("bad").is_none());

    let one: Value = server.get("/target/dut").await.json();
    assert_eq!(one["data"]["address"], "10.0.0.1:9339");

    server.delete("/target/dut").await.assert_status_ok();
    server.get("/target/dut").await.assert_status_not_found();
    Ok(())
}

#[tokio::test]
async fn uploaded_files_can_be_deleted() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;
    let server = &app.server;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"-----BEGIN CERTIFICATE-----".to_vec()).file_name("ca.pem"),
    );
    let response = server.post(routes::files::UPLOAD).multipart(form).await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let name = body["data"]["name"].as_str().unwrap().to_string();
    assert!(name.ends_with(".pem"));
    assert_eq!(body["data"]["size"], 27);

    let path = app.state.file_store().resolve(&name).await?;
    assert!(path.exists());

    server
        .delete(&format!("/file/{name}"))
        .await
        .assert_status_ok();
    assert!(!path.exists());
    server
        .delete(&format!("/file/{name}"))
        .await
        .assert_status_not_found();
    Ok(())
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;

    let form = MultipartForm::new().add_text("note", "no file here");
    app.server
        .post(routes::files::UPLOAD)
        .multipart(form)
        .await
        .assert_status_bad_request();
    Ok(())
}

#[tokio::test]
async fn catalog_is_listed_by_suite_and_order() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;

    let order: Value = app.server.get(routes::tests::ORDER).await.json();
    assert_eq!(
        order["data"],
        json!(["gnmi_capabilities", "gnmi_get", "gnoi_reboot"])
    );

    let suites: Value = app.server.get(routes::tests::CATALOG).await.json();
    let suites = suites["data"].as_array().unwrap();
    assert_eq!(suites.len(), 2);
    assert_eq!(suites[0]["suite"], "gnmi");
    assert_eq!(suites[0]["tests"].as_array().map(Vec::len), Some(2));
    assert_eq!(suites[1]["suite"], "gnoi");
    Ok(())
}

#[tokio::test]
async fn health_reports_idle_and_catalog_size() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;

    let body: Value = app.server.get(routes::HEALTH).await.json();
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["run_state"], "idle");
    assert_eq!(body["data"]["catalog_tests"], 3);
    Ok(())
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin_only() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;
    let router = create_app(app.state.clone());

    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri(routes::run::START)
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
    };

    let allowed = router
        .clone()
        .oneshot(preflight("http://localhost:3000")?)
        .await?;
    assert_eq!(
        allowed
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("http://localhost:3000")
    );

    let denied = router.oneshot(preflight("http://evil.example")?).await?;
    assert!(
        denied
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
    Ok(())
}

fn assert_json_error(response: &axum_test::TestResponse, status: StatusCode) {
    response.assert_status(status);
    assert!(
        response
            .header(header::CONTENT_TYPE)
            .to_str()
            .is_ok_and(|value| value.starts_with("application/json"))
    );
    let body: Value = response.json();
    assert_eq!(body["error"]["status"], status.as_u16());
    assert!(body["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn malformed_requests_get_json_errors() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;
    let server = &app.server;

    let malformed = server
        .post(routes::run::START)
        .content_type("application/json")
        .bytes("{\"prompts\": ".into())
        .await;
    assert_json_error(&malformed, StatusCode::BAD_REQUEST);

    let missing_field = server
        .post(routes::run::START)
        .json(&json!({ "prompts": "lab" }))
        .await;
    assert_json_error(&missing_field, StatusCode::UNPROCESSABLE_ENTITY);

    let bad_run_id = server
        .get(routes::run::OUTPUT)
        .add_query_param("run", "nope")
        .await;
    assert_json_error(&bad_run_id, StatusCode::BAD_REQUEST);

    let bad_offset = server
        .get(routes::run::OUTPUT)
        .add_query_param("offset", "-1")
        .await;
    assert_json_error(&bad_offset, StatusCode::BAD_REQUEST);

    let not_multipart = server
        .post(routes::files::UPLOAD)
        .json(&json!({ "file": "inline" }))
        .await;
    assert_json_error(&not_multipart, StatusCode::BAD_REQUEST);

    let unknown = server.get("/no/such/route").await;
    assert_json_error(&unknown, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn target_with_escaping_tls_file_is_rejected() -> Result<()> {
    let app = build_test_app(ScriptedEngine::new()).await?;

    let response = app
        .server
        .put("/target/dut")
        .json(&json!({ "address": "10.0.0.1:9339", "ca": "../ca.pem" }))
        .await;
    assert_json_error(&response, StatusCode::BAD_REQUEST);
    app.server.get("/target/dut").await.assert_status_not_found();
    Ok(())
}
