use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use thiserror::Error;
use tracing::{debug, instrument};

use super::{
    template,
    types::{RunRequest, RunSpec},
};
use crate::{
    ConfigStore, FileStore, TargetDescriptor, TestCatalog, TestDescriptor,
    error::{ResourceKind, TesterError},
};

/// Prompt name under which the target's name is always available.
pub const TARGET_NAME_PROMPT: &str = "target_name";
/// Prompt name under which the target's address is always available.
pub const TARGET_ADDRESS_PROMPT: &str = "target_address";

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: ResourceKind, name: String },

    #[error("unknown test: {0}")]
    UnknownTest(String),

    #[error("test {test} requires prompt '{prompt}'")]
    MissingPrompt { test: String, prompt: String },

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<TesterError> for ResolutionError {
    fn from(err: TesterError) -> Self {
        match err {
            TesterError::NotFound { kind, name } => {
                ResolutionError::NotFound { kind, name }
            }
            TesterError::InvalidInput(message) => {
                ResolutionError::InvalidReference(message)
            }
            other => ResolutionError::Store(other.to_string()),
        }
    }
}

/// Turns a [`RunRequest`] into an immutable [`RunSpec`].
///
/// Side-effect free: the result depends only on the request and the current
/// store and catalog contents.
#[derive(Clone)]
pub struct ConfigurationResolver {
    config: Arc<dyn ConfigStore>,
    files: Arc<dyn FileStore>,
    catalog: Arc<TestCatalog>,
}

impl std::fmt::Debug for ConfigurationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationResolver")
            .field("catalog_len", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl ConfigurationResolver {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        files: Arc<dyn FileStore>,
        catalog: Arc<TestCatalog>,
    ) -> Self {
        Self {
            config,
            files,
            catalog,
        }
    }

    pub fn catalog(&self) -> &TestCatalog {
        &self.catalog
    }

    #[instrument(skip(self), fields(prompts = %request.prompt_set, target = %request.target))]
    pub async fn resolve(
        &self,
        request: &RunRequest,
    ) -> Result<RunSpec, ResolutionError> {
        let prompt_set = self
            .config
            .get_prompt_set(&request.prompt_set)
            .await?
            .ok_or_else(|| ResolutionError::NotFound {
                kind: ResourceKind::PromptSet,
                name: request.prompt_set.clone(),
            })?;

        let stored_target = self
            .config
            .get_target(&request.target)
            .await?
            .ok_or_else(|| ResolutionError::NotFound {
                kind: ResourceKind::Target,
                name: request.target.clone(),
            })?;

        let selection = self.select_tests(request.tests.as_deref())?;
        let target = self.resolve_target(stored_target).await?;

        let mut prompts = prompt_set.prompts;
        for (key, file_id) in &prompt_set.files {
            let path = self.files.resolve(file_id).await?;
            prompts.insert(key.clone(), path.to_string_lossy().into_owned());
        }
        prompts.insert(TARGET_NAME_PROMPT.to_string(), target.name.clone());
        prompts.insert(TARGET_ADDRESS_PROMPT.to_string(), target.address.clone());

        let tests = selection
            .into_iter()
            .map(|test| render_test(test, &prompts))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(tests = tests.len(), "run request resolved");
        Ok(RunSpec {
            target,
            prompts,
            tests,
        })
    }

    /// Explicit selections keep caller order with repeats collapsed; an
    /// absent or empty selection is the whole catalog in catalog order.
    fn select_tests(
        &self,
        requested: Option<&[String]>,
    ) -> Result<Vec<&TestDescriptor>, ResolutionError> {
        match requested {
            Some(ids) if !ids.is_empty() => {
                let mut seen = HashSet::with_capacity(ids.len());
                let mut selected = Vec::with_capacity(ids.len());
                for id in ids {
                    let test = self
                        .catalog
                        .get(id)
                        .ok_or_else(|| ResolutionError::UnknownTest(id.clone()))?;
                    if seen.insert(id.as_str()) {
                        selected.push(test);
                    }
                }
                Ok(selected)
            }
            _ => Ok(self.catalog.tests().iter().collect()),
        }
    }

    async fn resolve_target(
        &self,
        mut target: TargetDescriptor,
    ) -> Result<TargetDescriptor, ResolutionError> {
        for slot in [&mut target.ca, &mut target.cert, &mut target.key] {
            if let Some(file_id) = slot.as_deref() {
                let path = self.files.resolve(file_id).await?;
                *slot = Some(path.to_string_lossy().into_owned());
            }
        }
        Ok(target)
    }
}

fn render_test(
    test: &TestDescriptor,
    prompts: &BTreeMap<String, String>,
) -> Result<TestDescriptor, ResolutionError> {
    let mut rendered = test.clone();
    for value in rendered.args.values_mut() {
        *value = template::render(value, prompts).map_err(|prompt| {
            ResolutionError::MissingPrompt {
                test: test.id.clone(),
                prompt,
            }
        })?;
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        PromptSet,
        stores::{FsFileStore, JsonConfigStore},
    };

    fn test(id: &str, args: &[(&str, &str)]) -> TestDescriptor {
        TestDescriptor {
            id: id.to_string(),
            suite: "gnmi".to_string(),
            description: String::new(),
            args: args
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            must_fail: false,
            wait_secs: 0,
        }
    }

    struct Fixture {
        resolver: ConfigurationResolver,
        config: Arc<JsonConfigStore>,
        files: Arc<FsFileStore>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(JsonConfigStore::in_memory());
        let files = Arc::new(FsFileStore::new(dir.path()).await.unwrap());
        let catalog = Arc::new(
            TestCatalog::new(vec![
                test("caps", &[]),
                test("get", &[("path", "{{get_path|/system}}")]),
                test("set", &[("value", "{{hostname}}")]),
            ])
            .unwrap(),
        );

        config
            .put_prompt_set(PromptSet::new("lab").with_prompt("hostname", "dut-1"))
            .await
            .unwrap();
        config
            .put_target(TargetDescriptor::new("dut", "127.0.0.1:9339"))
            .await
            .unwrap();

        let resolver = ConfigurationResolver::new(
            config.clone(),
            files.clone(),
            catalog,
        );
        Fixture {
            resolver,
            config,
            files,
            _dir: dir,
        }
    }

    fn ids(spec: &RunSpec) -> Vec<&str> {
        spec.tests.iter().map(|test| test.id.as_str()).collect()
    }

    #[tokio::test]
    async fn default_selection_follows_catalog_order() {
        let fx = fixture().await;
        let spec = fx
            .resolver
            .resolve(&RunRequest::new("lab", "dut"))
            .await
            .unwrap();

        assert_eq!(ids(&spec), vec!["caps", "get", "set"]);
        assert_eq!(spec.tests[1].args["path"], "/system");
        assert_eq!(spec.tests[2].args["value"], "dut-1");
        assert_eq!(spec.prompts[TARGET_ADDRESS_PROMPT], "127.0.0.1:9339");
        assert_eq!(spec.target.name, "dut");
    }

    #[tokio::test]
    async fn explicit_selection_keeps_caller_order_without_repeats() {
        let fx = fixture().await;
        let request =
            RunRequest::new("lab", "dut").with_tests(["set", "caps", "set"]);
        let spec = fx.resolver.resolve(&request).await.unwrap();
        assert_eq!(ids(&spec), vec!["set", "caps"]);
    }

    #[tokio::test]
    async fn empty_selection_means_whole_catalog() {
        let fx = fixture().await;
        let request = RunRequest::new("lab", "dut").with_tests(Vec::<String>::new());
        let spec = fx.resolver.resolve(&request).await.unwrap();
        assert_eq!(spec.tests.len(), 3);
    }

    #[tokio::test]
    async fn missing_prompt_set_or_target_is_not_found() {
        let fx = fixture().await;

        let err = fx
            .resolver
            .resolve(&RunRequest::new("nope", "dut"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::NotFound { kind: ResourceKind::PromptSet, ref name } if name == "nope"
        ));

        let err = fx
            .resolver
            .resolve(&RunRequest::new("lab", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::NotFound { kind: ResourceKind::Target, .. }
        ));
    }

    #[tokio::test]
    async fn unknown_test_is_rejected() {
        let fx = fixture().await;
        let request = RunRequest::new("lab", "dut").with_tests(["caps", "bogus"]);
        let err = fx.resolver.resolve(&request).await.unwrap_err();
        assert!(matches!(err, ResolutionError::UnknownTest(id) if id == "bogus"));
    }

    #[tokio::test]
    async fn missing_prompt_value_is_reported() {
        let fx = fixture().await;
        fx.config
            .put_prompt_set(PromptSet::new("bare"))
            .await
            .unwrap();
        let request = RunRequest::new("bare", "dut").with_tests(["set"]);
        let err = fx.resolver.resolve(&request).await.unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::MissingPrompt { ref test, .. } if test == "set"
        ));
    }

    #[tokio::test]
    async fn file_references_resolve_to_paths() {
        let fx = fixture().await;
        let stored = fx.files.store(Some("ca.pem"), b"---").await.unwrap();

        fx.config
            .put_prompt_set(
                PromptSet::new("certs")
                    .with_prompt("hostname", "dut-1")
                    .with_file("os_file", stored.name.clone()),
            )
            .await
            .unwrap();
        let mut target = TargetDescriptor::new("tls", "127.0.0.1:9339");
        target.ca = Some(stored.name.clone());
        fx.config.put_target(target).await.unwrap();

        let spec = fx
            .resolver
            .resolve(&RunRequest::new("certs", "tls"))
            .await
            .unwrap();
        let path = fx.files.resolve(&stored.name).await.unwrap();
        let path = path.to_string_lossy();
        assert_eq!(spec.prompts["os_file"], path);
        assert_eq!(spec.target.ca.as_deref(), Some(path.as_ref()));
    }

    #[tokio::test]
    async fn dangling_file_reference_is_not_found() {
        let fx = fixture().await;
        fx.config
            .put_prompt_set(PromptSet::new("dangling").with_file("os_file", "gone.bin"))
            .await
            .unwrap();
        let err = fx
            .resolver
            .resolve(&RunRequest::new("dangling", "dut"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::NotFound { kind: ResourceKind::File, .. }
        ));
    }

    #[tokio::test]
    async fn escaping_file_reference_is_invalid_not_internal() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        std::fs::write(
            &state,
            r#"{"prompts": {"lab": {"name": "lab", "files": {"os_file": "../../etc/passwd"}}},
               "targets": {"dut": {"name": "dut", "address": "127.0.0.1:9339"}}}"#,
        )
        .unwrap();

        let config = Arc::new(JsonConfigStore::open(&state).await.unwrap());
        let files = Arc::new(FsFileStore::new(dir.path().join("files")).await.unwrap());
        let resolver = ConfigurationResolver::new(
            config,
            files,
            Arc::new(TestCatalog::new(vec![test("caps", &[])]).unwrap()),
        );

        let err = resolver
            .resolve(&RunRequest::new("lab", "dut"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ResolutionError::InvalidReference(ref message) if message.contains("../../etc/passwd"))
        );
    }

    #[tokio::test]
    async fn spec_is_a_snapshot() {
        let fx = fixture().await;
        let spec = fx
            .resolver
            .resolve(&RunRequest::new("lab", "dut"))
            .await
            .unwrap();

        fx.config
            .put_prompt_set(PromptSet::new("lab").with_prompt("hostname", "changed"))
            .await
            .unwrap();
        assert_eq!(spec.tests[2].args["value"], "dut-1");
    }
}
