use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One runnable protocol test.
///
/// `args` values are templates; `{{prompt}}` placeholders are rendered from
/// the run's prompt map (`{{prompt|fallback}}` supplies a default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDescriptor {
    pub id: String,
    pub suite: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    /// The test passes when the engine reports a failure.
    #[serde(default)]
    pub must_fail: bool,
    /// Settle time after the test before the next one starts.
    #[serde(default)]
    pub wait_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteListing {
    pub suite: String,
    pub tests: Vec<TestDescriptor>,
}

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read test catalog {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse test catalog {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("duplicate test id '{0}' in catalog")]
    DuplicateTest(String),
    #[error("test catalog entry has an empty id")]
    EmptyId,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    tests: Vec<TestDescriptor>,
}

/// Read-only registry of available tests in canonical execution order.
#[derive(Debug, Clone)]
pub struct TestCatalog {
    tests: Vec<TestDescriptor>,
}

impl TestCatalog {
    pub fn new(tests: Vec<TestDescriptor>) -> Result<Self, CatalogLoadError> {
        let mut seen = HashSet::with_capacity(tests.len());
        for test in &tests {
            if test.id.trim().is_empty() {
                return Err(CatalogLoadError::EmptyId);
            }
            if !seen.insert(test.id.as_str()) {
                return Err(CatalogLoadError::DuplicateTest(test.id.clone()));
            }
        }
        Ok(Self { tests })
    }

    /// Load a catalog from a TOML (`[[tests]]`) or JSON (`{"tests": []}`)
    /// file. Unknown extensions try TOML first, then JSON.
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogLoadError> {
        let contents =
            fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str::<CatalogFile>(&contents)
                .map_err(|err| err.to_string()),
            Some("toml") => toml::from_str::<CatalogFile>(&contents)
                .map_err(|err| err.to_string()),
            _ => toml::from_str::<CatalogFile>(&contents).or_else(|toml_err| {
                serde_json::from_str::<CatalogFile>(&contents).map_err(
                    |json_err| {
                        format!("toml error: {toml_err}; json error: {json_err}")
                    },
                )
            }),
        };

        let file = parsed.map_err(|message| CatalogLoadError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        Self::new(file.tests)
    }

    /// Built-in gNMI/gNOI conformance catalog.
    pub fn builtin() -> Self {
        let tests = vec![
            builtin_test(
                "gnmi_capabilities",
                "gnmi",
                "Capabilities RPC advertises models and encodings",
                &[],
            ),
            builtin_test(
                "gnmi_get",
                "gnmi",
                "Get RPC returns state for a path",
                &[("path", "{{get_path|/system/state/hostname}}")],
            ),
            builtin_test(
                "gnmi_set",
                "gnmi",
                "Set RPC updates configuration",
                &[
                    ("path", "{{set_path|/system/config/hostname}}"),
                    ("value", "{{set_value}}"),
                ],
            ),
            builtin_test(
                "gnmi_subscribe_once",
                "gnmi",
                "Subscribe ONCE streams a full snapshot then sync_response",
                &[("path", "{{subscribe_path|/interfaces}}")],
            ),
            builtin_test(
                "gnmi_subscribe_poll",
                "gnmi",
                "Subscribe POLL answers poll requests",
                &[
                    ("path", "{{subscribe_path|/interfaces}}"),
                    ("polls", "{{poll_count|3}}"),
                ],
            ),
            builtin_test(
                "gnoi_cert_provision",
                "gnoi_cert",
                "Certificate Install provisions the target",
                &[
                    ("cert_id", "{{cert_id|gnxi-cert}}"),
                    ("common_name", "{{target_name}}"),
                ],
            ),
            builtin_test(
                "gnoi_cert_rotate",
                "gnoi_cert",
                "Certificate Rotate replaces an installed certificate",
                &[("cert_id", "{{cert_id|gnxi-cert}}")],
            ),
            TestDescriptor {
                must_fail: true,
                ..builtin_test(
                    "gnoi_cert_revoke_unknown",
                    "gnoi_cert",
                    "Revoking an unknown certificate is rejected",
                    &[("cert_id", "gnxi-unknown-cert")],
                )
            },
            builtin_test(
                "gnoi_os_install",
                "gnoi_os",
                "OS Install transfers an image",
                &[
                    ("os_file", "{{os_file}}"),
                    ("os_version", "{{os_version}}"),
                ],
            ),
            builtin_test(
                "gnoi_os_activate",
                "gnoi_os",
                "OS Activate selects the installed image",
                &[("os_version", "{{os_version}}")],
            ),
            TestDescriptor {
                wait_secs: 60,
                ..builtin_test(
                    "gnoi_system_reboot",
                    "gnoi_system",
                    "System Reboot restarts the target",
                    &[("delay", "{{reboot_delay|0}}")],
                )
            },
        ];
        Self { tests }
    }

    pub fn get(&self, id: &str) -> Option<&TestDescriptor> {
        self.tests.iter().find(|test| test.id == id)
    }

    pub fn tests(&self) -> &[TestDescriptor] {
        &self.tests
    }

    /// Test ids in canonical execution order.
    pub fn order(&self) -> Vec<String> {
        self.tests.iter().map(|test| test.id.clone()).collect()
    }

    /// Tests grouped by suite; suites appear in the order of their first test.
    pub fn suites(&self) -> Vec<SuiteListing> {
        let mut listings: Vec<SuiteListing> = Vec::new();
        for test in &self.tests {
            match listings
                .iter_mut()
                .find(|listing| listing.suite == test.suite)
            {
                Some(listing) => listing.tests.push(test.clone()),
                None => listings.push(SuiteListing {
                    suite: test.suite.clone(),
                    tests: vec![test.clone()],
                }),
            }
        }
        listings
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

fn builtin_test(
    id: &str,
    suite: &str,
    description: &str,
    args: &[(&str, &str)],
) -> TestDescriptor {
    TestDescriptor {
        id: id.to_string(),
        suite: suite.to_string(),
        description: description.to_string(),
        args: args
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        must_fail: false,
        wait_secs: 0,
    }
}
