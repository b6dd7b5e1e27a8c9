use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    output::{OutputBuffer, OutputChunk},
    types::{RunId, RunRecord, RunSpec, RunState, TestOutcome, TestResult},
};

/// Test id carried by the synthetic result recorded when a run fails.
pub const RUN_FAILURE_TEST_ID: &str = "run";

#[derive(Debug, Clone, Error)]
pub enum AdmitError {
    #[error("run {active} is already in progress")]
    Busy { active: RunId },
}

/// Result of a successful admission: the new record and the buffer the
/// executor writes to.
#[derive(Debug, Clone)]
pub struct Admission {
    pub record: RunRecord,
    pub output: Arc<OutputBuffer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub state: RunState,
    pub record: Option<RunRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputPoll {
    pub status: RunStatus,
    pub output: OutputChunk,
}

#[derive(Debug)]
struct RunSlot {
    record: Option<RunRecord>,
    output: Arc<OutputBuffer>,
}

impl RunSlot {
    fn running_mut(&mut self, id: RunId) -> Option<&mut RunRecord> {
        self.record
            .as_mut()
            .filter(|record| record.id == id && record.state == RunState::Running)
    }

    fn status(&self) -> RunStatus {
        RunStatus {
            state: self
                .record
                .as_ref()
                .map(|record| record.state)
                .unwrap_or(RunState::Idle),
            record: self.record.clone(),
        }
    }
}

/// Owner of the single run slot.
///
/// Every transition happens under one lock, so readers always get a
/// consistent snapshot and at most one record is `Running` at any instant.
/// `Completed`/`Failed` are idle-with-last-result: the next admission
/// replaces the record without an explicit reset.
#[derive(Debug)]
pub struct RunStateMachine {
    slot: Mutex<RunSlot>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(RunSlot {
                record: None,
                output: Arc::new(OutputBuffer::new()),
            }),
        }
    }

    /// Claim the slot for `spec`. Rejects with `Busy` while a run is active;
    /// a rejected admission leaves the current record and buffer untouched.
    pub fn admit(&self, spec: RunSpec) -> Result<Admission, AdmitError> {
        let mut slot = self.slot.lock();
        if let Some(active) = slot.record.as_ref()
            && active.state == RunState::Running
        {
            return Err(AdmitError::Busy { active: active.id });
        }

        let record = RunRecord {
            id: RunId::new(),
            spec: Arc::new(spec),
            state: RunState::Running,
            started_at: Utc::now(),
            ended_at: None,
            results: Vec::new(),
            failure: None,
        };
        let output = Arc::new(OutputBuffer::new());

        slot.record = Some(record.clone());
        slot.output = Arc::clone(&output);

        info!(
            run_id = %record.id,
            target = %record.spec.target.name,
            tests = record.spec.tests.len(),
            "run admitted"
        );
        Ok(Admission { record, output })
    }

    /// Record a per-test result while the run is still in flight.
    pub fn record_result(&self, id: RunId, result: TestResult) -> bool {
        let mut slot = self.slot.lock();
        match slot.running_mut(id) {
            Some(record) => {
                record.results.push(result);
                true
            }
            None => {
                warn!(run_id = %id, test = %result.test_id, "dropping result for run that is not active");
                false
            }
        }
    }

    /// `Running -> Completed`. Ignored (and logged) for a stale id.
    pub fn complete(&self, id: RunId, results: Vec<TestResult>) -> bool {
        let mut slot = self.slot.lock();
        let Some(record) = slot.running_mut(id) else {
            warn!(run_id = %id, "complete called for run that is not active");
            return false;
        };

        record.results = results;
        record.state = RunState::Completed;
        record.ended_at = Some(Utc::now());
        info!(
            run_id = %id,
            results = record.results.len(),
            "run completed"
        );
        true
    }

    /// `Running -> Failed`. Results recorded so far are kept and the reason is
    /// appended as a synthetic `Error` result and as an output line.
    pub fn fail(&self, id: RunId, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let mut slot = self.slot.lock();
        let output = Arc::clone(&slot.output);
        let Some(record) = slot.running_mut(id) else {
            warn!(run_id = %id, %reason, "fail called for run that is not active");
            return false;
        };

        // Line first: a reader that observes `Failed` must also see it.
        output.append(format!("run failed: {reason}"));
        record.results.push(TestResult::new(
            RUN_FAILURE_TEST_ID,
            TestOutcome::Error,
            reason.clone(),
        ));
        record.failure = Some(reason.clone());
        record.state = RunState::Failed;
        record.ended_at = Some(Utc::now());
        warn!(run_id = %id, %reason, "run failed");
        true
    }

    pub fn current_status(&self) -> RunStatus {
        self.slot.lock().status()
    }

    pub fn state(&self) -> RunState {
        self.slot
            .lock()
            .record
            .as_ref()
            .map(|record| record.state)
            .unwrap_or(RunState::Idle)
    }

    pub fn output(&self) -> Arc<OutputBuffer> {
        Arc::clone(&self.slot.lock().output)
    }

    /// Status snapshot plus output lines from `offset`.
    ///
    /// The status is taken before the lines are read and the executor writes
    /// every line before its terminal transition, so a poll reporting a
    /// terminal state carries the complete output. A `run` that is not the
    /// current run restarts reading at 0.
    ///
    /// Without `run` the offset is applied to whatever run is current. A
    /// client that keeps its offset across a new admission skips that many
    /// of the new run's lines; the returned record id changes at admission,
    /// so clients either pass `run` or reset their offset when it does.
    pub fn poll(&self, run: Option<RunId>, offset: usize) -> OutputPoll {
        let (status, output) = {
            let slot = self.slot.lock();
            (slot.status(), Arc::clone(&slot.output))
        };

        let current = status.record.as_ref().map(|record| record.id);
        let offset = match (run, current) {
            (Some(requested), Some(current)) if requested != current => 0,
            _ => offset,
        };

        OutputPoll {
            status,
            output: output.read_from(offset),
        }
    }
}
