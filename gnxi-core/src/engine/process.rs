use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpStream,
    process::Command,
};
use tracing::{debug, instrument, warn};

use crate::{
    EngineError, OutputBuffer, TargetDescriptor, TestEngine, TestInvocation,
    TestVerdict,
};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEngineSettings {
    /// Runner executable, looked up on `PATH` when not absolute.
    pub command: String,
    /// Arguments passed ahead of the per-test arguments.
    pub args: Vec<String>,
    pub probe_timeout: Duration,
}

impl ProcessEngineSettings {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Runs each test as a child process of an external runner binary.
///
/// The runner receives `--test=<id>`, the target flags and one
/// `--<arg>=<value>` per rendered test argument. Its stdout and stderr are
/// streamed into the run output line by line; exit status 0 is a pass.
#[derive(Debug, Clone)]
pub struct ProcessTestEngine {
    settings: ProcessEngineSettings,
}

impl ProcessTestEngine {
    pub fn new(settings: ProcessEngineSettings) -> Self {
        Self { settings }
    }

    fn runner_args(&self, invocation: &TestInvocation<'_>) -> Vec<String> {
        let target = invocation.target;
        let mut args = self.settings.args.clone();
        args.push(format!("--test={}", invocation.test.id));
        args.push(format!("--target_name={}", target.name));
        args.push(format!("--target_addr={}", target.address));

        for (flag, path) in target.file_refs() {
            if let Some(path) = path {
                args.push(format!("--{flag}={path}"));
            }
        }
        for (key, value) in &invocation.test.args {
            args.push(format!("--{key}={value}"));
        }
        args
    }

    fn build_command(&self, invocation: &TestInvocation<'_>) -> Command {
        let mut cmd = Command::new(&self.settings.command);
        cmd.args(self.runner_args(invocation))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl TestEngine for ProcessTestEngine {
    #[instrument(skip(self), fields(address = %target.address))]
    async fn probe(&self, target: &TargetDescriptor) -> Result<(), EngineError> {
        let unreachable = |reason: String| EngineError::Unreachable {
            address: target.address.clone(),
            reason,
        };

        match tokio::time::timeout(
            self.settings.probe_timeout,
            TcpStream::connect(target.address.as_str()),
        )
        .await
        {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(err)) => Err(unreachable(err.to_string())),
            Err(_) => Err(unreachable(format!(
                "no answer within {}",
                humantime::format_duration(self.settings.probe_timeout)
            ))),
        }
    }

    #[instrument(skip_all, fields(test = %invocation.test.id))]
    async fn run_test(
        &self,
        invocation: TestInvocation<'_>,
        sink: &OutputBuffer,
    ) -> Result<TestVerdict, EngineError> {
        let mut child = self.build_command(&invocation).spawn().map_err(|err| {
            EngineError::Fatal(format!(
                "failed to start test runner '{}': {err}",
                self.settings.command
            ))
        })?;
        debug!(pid = ?child.id(), "test runner started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Fatal("runner stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Fatal("runner stderr not captured".into()))?;

        let mut stdout = BufReader::new(stdout).lines();
        let mut stderr = BufReader::new(stderr).lines();
        let (mut stdout_open, mut stderr_open) = (true, true);

        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => sink.append(line),
                    Ok(None) => stdout_open = false,
                    Err(err) => {
                        warn!(error = %err, "failed reading runner stdout");
                        stdout_open = false;
                    }
                },
                line = stderr.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => sink.append(line),
                    Ok(None) => stderr_open = false,
                    Err(err) => {
                        warn!(error = %err, "failed reading runner stderr");
                        stderr_open = false;
                    }
                },
            }
        }

        let status = child.wait().await.map_err(|err| {
            EngineError::Fatal(format!("failed waiting for test runner: {err}"))
        })?;

        if status.success() {
            return Ok(TestVerdict::pass(""));
        }
        Ok(TestVerdict::fail(match status.code() {
            Some(code) => format!("exit status {code}"),
            None => "runner terminated by signal".to_string(),
        }))
    }
}
