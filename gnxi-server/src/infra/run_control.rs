use std::{fmt, sync::Arc};

use axum::http::StatusCode;
use gnxi_core::{
    AdmitError, ConfigurationResolver, OutputPoll, ResolutionError, RunExecutor,
    RunId, RunRecord, RunRequest, RunStateMachine, RunStatus,
    api::RunAcceptedResponse, run::OutputBuffer,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{Instrument, error, info, info_span, instrument, warn};

/// Admission and background scheduling for runs.
///
/// `start_run` resolves and admits synchronously, hands the run to a worker
/// task and returns. The worker reports back through the state machine only,
/// so HTTP readers never wait on it.
#[derive(Clone)]
pub struct RunControlPlane {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: ConfigurationResolver,
    executor: RunExecutor,
    machine: Arc<RunStateMachine>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl fmt::Debug for RunControlPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunControlPlane")
            .field("state", &self.inner.machine.state())
            .field("workers", &self.inner.tasks.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunControlError {
    NotFound(String),
    InvalidRequest(String),
    Busy { active: RunId },
    ShuttingDown,
    Internal(String),
}

impl RunControlError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RunControlError::NotFound(_) => StatusCode::NOT_FOUND,
            RunControlError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RunControlError::Busy { .. } => StatusCode::CONFLICT,
            RunControlError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            RunControlError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RunControlError::NotFound(message)
            | RunControlError::InvalidRequest(message)
            | RunControlError::Internal(message) => message.clone(),
            RunControlError::Busy { active } => {
                format!("run {active} is already in progress")
            }
            RunControlError::ShuttingDown => {
                "server is shutting down; no new runs are accepted".to_string()
            }
        }
    }
}

impl fmt::Display for RunControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for RunControlError {}

impl From<ResolutionError> for RunControlError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::NotFound { .. } => {
                RunControlError::NotFound(err.to_string())
            }
            ResolutionError::UnknownTest(_)
            | ResolutionError::MissingPrompt { .. }
            | ResolutionError::InvalidReference(_) => {
                RunControlError::InvalidRequest(err.to_string())
            }
            ResolutionError::Store(message) => RunControlError::Internal(message),
        }
    }
}

impl From<AdmitError> for RunControlError {
    fn from(err: AdmitError) -> Self {
        match err {
            AdmitError::Busy { active } => RunControlError::Busy { active },
        }
    }
}

impl RunControlPlane {
    pub fn new(resolver: ConfigurationResolver, executor: RunExecutor) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver,
                executor,
                machine: Arc::new(RunStateMachine::new()),
                tasks: TaskTracker::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    #[instrument(skip(self, request), fields(target = %request.target))]
    pub async fn start_run(
        &self,
        request: RunRequest,
    ) -> Result<RunAcceptedResponse, RunControlError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(RunControlError::ShuttingDown);
        }

        let spec = self.inner.resolver.resolve(&request).await?;
        let admission = self.inner.machine.admit(spec)?;
        let record = admission.record;

        let accepted = RunAcceptedResponse {
            run_id: record.id,
            state: record.state,
            tests: record.spec.tests.iter().map(|test| test.id.clone()).collect(),
        };

        let span = info_span!("run", run_id = %record.id);
        let worker = Arc::clone(&self.inner);
        self.inner.tasks.spawn(
            async move { worker.drive(record, admission.output).await }
                .instrument(span),
        );

        Ok(accepted)
    }

    pub fn status(&self) -> RunStatus {
        self.inner.machine.current_status()
    }

    pub fn poll_output(&self, run: Option<RunId>, offset: usize) -> OutputPoll {
        self.inner.machine.poll(run, offset)
    }

    /// Stop accepting runs, cancel the in-flight one and wait for its worker
    /// to record the terminal state.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.tasks.close();
        if !self.inner.tasks.is_empty() {
            info!(workers = self.inner.tasks.len(), "waiting for run workers to stop");
        }
        self.inner.tasks.wait().await;
    }
}

/// Failure reason recorded when the executor task dies without a report.
pub const WORKER_PANICKED: &str = "run worker panicked";

impl Inner {
    async fn drive(&self, record: RunRecord, output: Arc<OutputBuffer>) {
        let id = record.id;

        // The executor runs in its own task so a panic surfaces as a
        // `JoinError` here and the slot still reaches a terminal state.
        let execution = {
            let executor = self.executor.clone();
            let spec = Arc::clone(&record.spec);
            let cancel = self.shutdown.child_token();
            let machine = Arc::clone(&self.machine);
            tokio::spawn(
                async move {
                    executor
                        .execute(&spec, &output, &cancel, |result| {
                            machine.record_result(id, result.clone());
                        })
                        .await
                }
                .in_current_span(),
            )
        };

        let report = match execution.await {
            Ok(report) => report,
            Err(err) => {
                let reason = if err.is_panic() {
                    WORKER_PANICKED.to_string()
                } else {
                    format!("run worker aborted: {err}")
                };
                error!(error = %err, "run worker stopped without a report");
                if !self.machine.fail(id, reason) {
                    warn!("run slot moved on before failure could be recorded");
                }
                return;
            }
        };

        match report.failure {
            Some(failure) => {
                if !self.machine.fail(id, failure.to_string()) {
                    warn!("run slot moved on before failure could be recorded");
                }
            }
            None => {
                if !self.machine.complete(id, report.results) {
                    error!("run slot moved on before completion could be recorded");
                }
            }
        }
    }
}
