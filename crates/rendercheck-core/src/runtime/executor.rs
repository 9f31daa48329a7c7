// crates/rendercheck-core/src/runtime/executor.rs
// ============================================================================
// Module: rendercheck Shell Executor
// Description: `tokio::process` backed command execution with timeouts.
// Purpose: Run a test's command in its working directory and capture output.
// Dependencies: crate::interfaces, async-trait, tokio
// ============================================================================

//! ## Overview
//! Commands are handed to the platform shell (`sh -c` or `cmd /C`) so that
//! declarations can use redirection and quoting. The child is spawned with
//! `kill_on_drop`, so abandoning the wait on timeout kills it. On Unix the
//! shell also leads its own process group, and a timeout kills the whole
//! group so that processes the shell started do not outlive the test.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use crate::interfaces::CommandExecutor;
use crate::interfaces::CommandOutput;
use crate::interfaces::CommandRequest;
use crate::interfaces::ExecutionError;

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Executor that runs commands through the platform shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandExecutor;

impl ShellCommandExecutor {
    /// Creates an executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for ShellCommandExecutor {
    async fn execute(&self, request: CommandRequest<'_>) -> Result<CommandOutput, ExecutionError> {
        let mut command = shell_command(request.command);
        command
            .current_dir(request.working_dir)
            .envs(request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let child = command.spawn().map_err(|err| ExecutionError::Launch(err.to_string()))?;
        let process_group = child.id();
        let Ok(output) = tokio::time::timeout(request.timeout, child.wait_with_output()).await
        else {
            if let Some(group) = process_group {
                kill_process_group(group).await;
            }
            return Err(ExecutionError::Timeout(request.timeout));
        };
        let output = output.map_err(|err| ExecutionError::Io(err.to_string()))?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
            elapsed: started.elapsed(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a shell invocation for a command line.
#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}

/// Builds a shell invocation for a command line.
#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(line);
    command
}

/// Sends `SIGKILL` to every process in the group led by `group`.
///
/// The shell's `kill` builtin accepts a negative pid for a group. Failures
/// are ignored; the group is usually already gone when nothing was spawned.
#[cfg(unix)]
async fn kill_process_group(group: u32) {
    let _ = Command::new("sh")
        .arg("-c")
        .arg(format!("kill -s KILL -- -{group}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
}

/// Without Unix process groups only the shell itself is killed, by `kill_on_drop`.
#[cfg(not(unix))]
async fn kill_process_group(_group: u32) {}
