use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use axum_test::TestServer;
use gnxi_config::{
    CatalogConfig, Config, ConfigMetadata, CorsConfig, EngineConfig, RunConfig,
    ServerConfig, StorageConfig,
};
use gnxi_core::{
    EngineError, OutputBuffer, PromptSet, RunState, TargetDescriptor,
    TestCatalog, TestDescriptor, TestEngine, TestInvocation, TestVerdict,
    stores::{FsFileStore, JsonConfigStore},
};
use gnxi_server::{AppState, create_app};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Semaphore;

pub const REACHABLE: &str = "127.0.0.1:9339";
pub const UNREACHABLE: &str = "127.0.0.1:1";

/// Engine double: unreachable addresses fail the probe; tests with
/// `expect = "fail"` report a failure. When gated, every test waits for a
/// permit so a run can be held in `Running`.
#[derive(Debug)]
pub struct ScriptedEngine {
    gate: Option<Arc<Semaphore>>,
    unreachable: HashSet<String>,
    panics: bool,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            gate: None,
            unreachable: HashSet::from([UNREACHABLE.to_string()]),
            panics: false,
        }
    }

    /// Every test panics inside the engine.
    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::new()
        }
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }
}

#[async_trait]
impl TestEngine for ScriptedEngine {
    async fn probe(&self, target: &TargetDescriptor) -> Result<(), EngineError> {
        if self.unreachable.contains(&target.address) {
            return Err(EngineError::Unreachable {
                address: target.address.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn run_test(
        &self,
        invocation: TestInvocation<'_>,
        sink: &OutputBuffer,
    ) -> Result<TestVerdict, EngineError> {
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| EngineError::Fatal("gate closed".to_string()))?;
        }
        sink.append(format!("running {}", invocation.test.id));
        if self.panics {
            panic!("engine crashed in {}", invocation.test.id);
        }
        match invocation.test.args.get("expect").map(String::as_str) {
            Some("fail") => Ok(TestVerdict::fail("assertion failed")),
            _ => Ok(TestVerdict::pass("")),
        }
    }
}

fn test(id: &str, suite: &str, args: &[(&str, &str)]) -> TestDescriptor {
    TestDescriptor {
        id: id.to_string(),
        suite: suite.to_string(),
        description: format!("{id} check"),
        args: args
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>(),
        must_fail: false,
        wait_secs: 0,
    }
}

pub fn catalog() -> TestCatalog {
    TestCatalog::new(vec![
        test("gnmi_capabilities", "gnmi", &[]),
        test("gnmi_get", "gnmi", &[("path", "{{get_path|/system}}")]),
        test("gnoi_reboot", "gnoi", &[("expect", "fail")]),
    ])
    .expect("fixture catalog is valid")
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8888,
        },
        storage: StorageConfig {
            state_file: None,
            files_dir: dir.path().join("files"),
        },
        catalog: CatalogConfig::default(),
        engine: EngineConfig {
            command: "gnxi-test-runner".to_string(),
            args: Vec::new(),
            probe_timeout: Duration::from_secs(1),
            test_timeout: Some(Duration::from_secs(30)),
        },
        run: RunConfig {
            timeout: Some(Duration::from_secs(60)),
        },
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allowed_headers: vec!["content-type".to_string()],
        },
        metadata: ConfigMetadata::default(),
    }
}

// Shared across test binaries; not every binary uses every field.
#[allow(unused)]
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    _tempdir: TempDir,
}

#[allow(unused)]
pub async fn build_test_app(engine: ScriptedEngine) -> Result<TestApp> {
    build_test_app_with(engine, |_| {}).await
}

/// Like [`build_test_app`] with `configure` applied to the config first.
#[allow(unused)]
pub async fn build_test_app_with(
    engine: ScriptedEngine,
    configure: impl FnOnce(&mut Config),
) -> Result<TestApp> {
    let tempdir = tempfile::tempdir()?;
    let mut config = test_config(&tempdir);
    configure(&mut config);
    let config = Arc::new(config);
    let file_store = FsFileStore::new(config.files_dir()).await?;

    let state = AppState::new(
        config,
        Arc::new(JsonConfigStore::in_memory()),
        Arc::new(file_store),
        Arc::new(catalog()),
        Arc::new(engine),
    );
    let server = TestServer::new(create_app(state.clone()))
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        state,
        _tempdir: tempdir,
    })
}

/// Store a prompt set named `lab` and targets `dut` (reachable) and `down`.
#[allow(unused)]
pub async fn seed(state: &AppState) -> Result<()> {
    state
        .config_store()
        .put_prompt_set(PromptSet::new("lab").with_prompt("get_path", "/interfaces"))
        .await?;
    state
        .config_store()
        .put_target(TargetDescriptor::new("dut", REACHABLE))
        .await?;
    state
        .config_store()
        .put_target(TargetDescriptor::new("down", UNREACHABLE))
        .await?;
    Ok(())
}

/// Poll `/run/output` until the run leaves `Running`, collecting every line.
#[allow(unused)]
pub async fn wait_for_terminal(server: &TestServer) -> (Value, Vec<String>) {
    let mut offset = 0u64;
    let mut lines = Vec::new();
    for _ in 0..200 {
        let body: Value = server
            .get("/run/output")
            .add_query_param("offset", offset)
            .await
            .json();
        let data = &body["data"];
        if let Some(batch) = data["lines"].as_array() {
            lines.extend(
                batch
                    .iter()
                    .filter_map(|line| line.as_str().map(str::to_owned)),
            );
        }
        offset = data["next_offset"].as_u64().unwrap_or(offset);

        let state: RunState =
            serde_json::from_value(data["state"].clone()).expect("state field");
        if state.is_terminal() {
            return (body, lines);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run did not reach a terminal state");
}
