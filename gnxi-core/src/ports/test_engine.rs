use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    TargetDescriptor, TestDescriptor,
    run::{OutputBuffer, TestOutcome},
};

/// Everything an engine needs to execute one test. Borrowed from the
/// immutable run snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TestInvocation<'a> {
    pub target: &'a TargetDescriptor,
    pub test: &'a TestDescriptor,
    /// Full prompt map of the run. `test.args` are already rendered from it;
    /// engines that take parameters outside the argument list (an in-process
    /// gNMI client, a config file writer) read them here.
    pub prompts: &'a BTreeMap<String, String>,
}

/// Engine verdict for a single test before `must_fail` is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVerdict {
    pub outcome: TestOutcome,
    pub detail: String,
}

impl TestVerdict {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            outcome: TestOutcome::Pass,
            detail: detail.into(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            outcome: TestOutcome::Fail,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The target cannot be reached; no further test can succeed.
    #[error("target {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    /// The engine itself cannot continue (missing binary, broken pipe, ...).
    #[error("engine failure: {0}")]
    Fatal(String),

    /// The test could not be evaluated; the run carries on.
    #[error("{0}")]
    Test(String),
}

impl EngineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Unreachable { .. } | EngineError::Fatal(_))
    }
}

/// External protocol test engine.
///
/// Implementations stream textual output into `sink` while the test runs so
/// polling clients observe progress.
#[async_trait]
pub trait TestEngine: Send + Sync {
    /// Check the target is reachable before a run starts.
    async fn probe(&self, target: &TargetDescriptor) -> Result<(), EngineError>;

    async fn run_test(
        &self,
        invocation: TestInvocation<'_>,
        sink: &OutputBuffer,
    ) -> Result<TestVerdict, EngineError>;
}
