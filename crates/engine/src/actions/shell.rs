// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell command execution.

use crate::actions::{Act, ActionError};
use crate::context::{ActionResult, ExecutionContext};
use crate::step::ValidationError;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured output of a finished (or killed) subprocess.
pub(crate) struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
}

impl From<ShellOutput> for ActionResult {
    fn from(out: ShellOutput) -> Self {
        ActionResult {
            stdout: out.stdout,
            stderr: out.stderr,
            status: out.status,
            outputs: Default::default(),
        }
    }
}

/// Run `executor -c command` under the context's step scope.
///
/// The subprocess environment is the host environment overlaid with the
/// scope's merged playbook and step exports. Honors the scope timeout and
/// the cooperative cancellation token: a timeout surfaces as
/// `io::ErrorKind::TimedOut`, cancellation as `io::ErrorKind::Interrupted`,
/// and the child is killed in both cases.
pub(crate) fn run_shell(
    executor: &str,
    command: &str,
    ctx: &ExecutionContext,
) -> io::Result<ShellOutput> {
    let mut cmd = Command::new(executor);
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in &ctx.scope.env {
        cmd.env(key, value);
    }
    if let Some(cwd) = &ctx.scope.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = cmd.spawn()?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = ctx.scope.timeout.map(|t| Instant::now() + t);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status.code();
        }
        if ctx.cancel.is_cancelled() {
            kill_quietly(&mut child);
            return Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            kill_quietly(&mut child);
            return Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    Ok(ShellOutput {
        stdout: join_reader(stdout),
        stderr: join_reader(stderr),
        status,
    })
}

/// Read a child pipe to the end on a helper thread so the child never
/// blocks on a full pipe buffer while we poll for exit.
fn drain<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> Option<std::thread::JoinHandle<String>> {
    pipe.map(|mut r| {
        std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = r.read_to_string(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<std::thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn kill_quietly(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::debug!(error = %err, "could not kill child process");
    }
    let _ = child.wait();
}

fn map_io(err: io::Error, timeout_seconds: Option<u64>) -> ActionError {
    match err.kind() {
        io::ErrorKind::TimedOut => ActionError::Timeout {
            seconds: timeout_seconds.unwrap_or_default(),
        },
        io::ErrorKind::Interrupted => ActionError::Cancelled,
        _ => ActionError::Io(err),
    }
}

/// Run a command through a shell interpreter, capturing stdio and exit
/// status. A nonzero exit is an execution error.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellAction {
    pub command: String,
    pub executor: String,
}

impl ShellAction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            executor: "sh".to_string(),
        }
    }

    pub fn with_executor(mut self, executor: impl Into<String>) -> Self {
        self.executor = executor.into();
        self
    }
}

impl Act for ShellAction {
    fn validate(&self, _ctx: &ExecutionContext) -> Result<(), ValidationError> {
        if self.command.trim().is_empty() {
            return Err(ValidationError::EmptyCommand);
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        let timeout = ctx.scope.timeout.map(|t| t.as_secs());
        let output = run_shell(&self.executor, &self.command, ctx)
            .map_err(|e| map_io(e, timeout))?;
        match output.status {
            Some(0) => Ok(output.into()),
            status => {
                tracing::debug!(stderr = %output.stderr, "command failed");
                Err(ActionError::CommandFailed {
                    status: status.unwrap_or(-1),
                })
            }
        }
    }

    fn cleanup(&mut self, _ctx: &ExecutionContext) -> Result<ActionResult, ActionError> {
        Err(ActionError::NoInverse("shell"))
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
