use std::{future::Future, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{
    output::OutputBuffer,
    types::{RunSpec, TestOutcome, TestResult},
};
use crate::{EngineError, TestDescriptor, TestEngine, TestInvocation, TestVerdict};

pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Upper bound for a single test. `None` waits for the engine.
    pub test_timeout: Option<Duration>,
    /// Upper bound for the whole run, probe included.
    pub run_timeout: Option<Duration>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            test_timeout: Some(DEFAULT_TEST_TIMEOUT),
            run_timeout: None,
        }
    }
}

/// Reasons the executor stopped before the end of the test sequence.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("run cancelled")]
    Cancelled,

    #[error("run timed out after {}", humantime::format_duration(*.0))]
    TimedOut(Duration),
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub results: Vec<TestResult>,
    pub failure: Option<ExecutionError>,
}

impl ExecutionReport {
    fn finished(results: Vec<TestResult>) -> Self {
        Self {
            results,
            failure: None,
        }
    }

    fn stopped(results: Vec<TestResult>, failure: ExecutionError) -> Self {
        Self {
            results,
            failure: Some(failure),
        }
    }

    pub fn count(&self, outcome: TestOutcome) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome == outcome)
            .count()
    }
}

/// Drives the ordered test sequence of one run against the engine.
///
/// A single test's failure never aborts the sequence; only an unreachable
/// target, a fatal engine error, cancellation or the run deadline do.
/// Every line is written to the sink before `execute` returns.
#[derive(Clone)]
pub struct RunExecutor {
    engine: Arc<dyn TestEngine>,
    settings: ExecutorSettings,
}

impl std::fmt::Debug for RunExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunExecutor")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RunExecutor {
    pub fn new(engine: Arc<dyn TestEngine>, settings: ExecutorSettings) -> Self {
        Self { engine, settings }
    }

    /// Run `spec` to the end or to the first run-level failure.
    ///
    /// `on_result` observes each per-test result as soon as it is known so
    /// the caller can publish progress.
    #[instrument(skip_all, fields(target = %spec.target.name, tests = spec.tests.len()))]
    pub async fn execute<F>(
        &self,
        spec: &RunSpec,
        sink: &OutputBuffer,
        cancel: &CancellationToken,
        mut on_result: F,
    ) -> ExecutionReport
    where
        F: FnMut(&TestResult) + Send,
    {
        let deadline = self.settings.run_timeout.and_then(run_deadline);
        let mut results = Vec::with_capacity(spec.tests.len());

        sink.append(format!(
            "starting run against {} ({}) with {} test(s)",
            spec.target.name,
            spec.target.address,
            spec.tests.len()
        ));

        match self
            .guard(self.engine.probe(&spec.target), cancel, deadline)
            .await
        {
            Ok(Ok(())) => debug!("target probe succeeded"),
            Ok(Err(err)) => {
                warn!(error = %err, "target probe failed");
                return ExecutionReport::stopped(results, err.into());
            }
            Err(stop) => return ExecutionReport::stopped(results, stop),
        }

        for (index, test) in spec.tests.iter().enumerate() {
            sink.append(format!("=== RUN {}", test.id));

            let invocation = TestInvocation {
                target: &spec.target,
                test,
                prompts: &spec.prompts,
            };
            let attempt = self.run_one(invocation, sink);
            let (result, fatal) = match self.guard(attempt, cancel, deadline).await {
                Ok(outcome) => settle(test, outcome),
                Err(stop) => return ExecutionReport::stopped(results, stop),
            };

            sink.append(result_line(&result));
            on_result(&result);
            results.push(result);

            if let Some(err) = fatal {
                warn!(test = %test.id, error = %err, "engine cannot continue");
                return ExecutionReport::stopped(results, err.into());
            }

            let is_last = index + 1 == spec.tests.len();
            if test.wait_secs > 0 && !is_last {
                sink.append(format!(
                    "waiting {}s before next test",
                    test.wait_secs
                ));
                let pause = tokio::time::sleep(Duration::from_secs(test.wait_secs));
                if let Err(stop) = self.guard(pause, cancel, deadline).await {
                    return ExecutionReport::stopped(results, stop);
                }
            }
        }

        let report = ExecutionReport::finished(results);
        let (passed, failed, errored) = (
            report.count(TestOutcome::Pass),
            report.count(TestOutcome::Fail),
            report.count(TestOutcome::Error),
        );
        sink.append(format!(
            "run finished: {passed} passed, {failed} failed, {errored} errored"
        ));
        info!(passed, failed, errored, "test sequence finished");
        report
    }

    async fn run_one(
        &self,
        invocation: TestInvocation<'_>,
        sink: &OutputBuffer,
    ) -> Result<Result<TestVerdict, EngineError>, Duration> {
        let attempt = self.engine.run_test(invocation, sink);
        match self.settings.test_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| limit),
            None => Ok(attempt.await),
        }
    }

    /// Race `work` against cancellation and the run deadline.
    async fn guard<T>(
        &self,
        work: impl Future<Output = T>,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<T, ExecutionError> {
        let expiry = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExecutionError::Cancelled),
            _ = expiry => Err(ExecutionError::TimedOut(
                self.settings.run_timeout.unwrap_or_default(),
            )),
            value = work => Ok(value),
        }
    }
}

/// Deadline `limit` from now. A limit past the clock's range means no
/// deadline.
fn run_deadline(limit: Duration) -> Option<Instant> {
    let deadline = Instant::now().checked_add(limit);
    if deadline.is_none() {
        warn!(
            limit = %humantime::format_duration(limit),
            "run timeout exceeds the clock range; running without a deadline"
        );
    }
    deadline
}

/// Fold an engine attempt into the recorded result; returns the error that
/// must end the run, if any.
fn settle(
    test: &TestDescriptor,
    attempt: Result<Result<TestVerdict, EngineError>, Duration>,
) -> (TestResult, Option<EngineError>) {
    match attempt {
        Err(limit) => (
            TestResult::new(
                &test.id,
                TestOutcome::Error,
                format!("timed out after {}", humantime::format_duration(limit)),
            ),
            None,
        ),
        Ok(Ok(verdict)) => (expected(test, verdict), None),
        Ok(Err(err)) => {
            let result =
                TestResult::new(&test.id, TestOutcome::Error, err.to_string());
            (result, err.is_fatal().then_some(err))
        }
    }
}

fn expected(test: &TestDescriptor, verdict: TestVerdict) -> TestResult {
    if !test.must_fail {
        return TestResult::new(&test.id, verdict.outcome, verdict.detail);
    }
    match verdict.outcome {
        TestOutcome::Fail => TestResult::new(
            &test.id,
            TestOutcome::Pass,
            format!("failed as expected: {}", verdict.detail),
        ),
        TestOutcome::Pass => TestResult::new(
            &test.id,
            TestOutcome::Fail,
            format!("expected failure but test passed: {}", verdict.detail),
        ),
        TestOutcome::Error => {
            TestResult::new(&test.id, TestOutcome::Error, verdict.detail)
        }
    }
}

fn result_line(result: &TestResult) -> String {
    let line = format!("--- {}: {} {}", result.outcome, result.test_id, result.detail);
    line.trim_end().to_string()
}
