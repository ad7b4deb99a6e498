// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{ExecError, ExecResult};

/// Privilege-escalation wrapper prepended to elevated commands.
pub const ELEVATION_PREFIX: &str = "sudo";

/// Trait for running external commands.
///
/// Implementations block the calling task until the process exits and
/// return its stdout. A non-zero exit is an error carrying whatever the
/// process printed.
#[async_trait]
pub trait CommandRunner: Send + Sync {
	async fn run(&self, command: &str, elevated: bool) -> ExecResult<String>;
}

/// Apply the elevation wrapper to a command line.
pub fn wrap_command(command: &str, elevated: bool) -> String {
	if elevated {
		format!("{ELEVATION_PREFIX} {command}")
	} else {
		command.to_string()
	}
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
	timeout: Option<Duration>,
}

impl ShellRunner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Kill commands that run longer than `limit`.
	pub fn with_timeout(limit: Duration) -> Self {
		Self {
			timeout: Some(limit),
		}
	}
}

#[async_trait]
impl CommandRunner for ShellRunner {
	async fn run(&self, command: &str, elevated: bool) -> ExecResult<String> {
		let command_line = wrap_command(command, elevated);

		tracing::debug!(command = %command_line, "executing command");

		let mut cmd = Command::new("sh");
		cmd
			.arg("-c")
			.arg(&command_line)
			.stdin(Stdio::null())
			.kill_on_drop(true);

		let output = match self.timeout {
			Some(limit) => match timeout(limit, cmd.output()).await {
				Ok(result) => result,
				Err(_) => {
					tracing::warn!(command = %command_line, timeout = ?limit, "command timed out");
					return Err(ExecError::TimedOut {
						command: command_line,
						timeout: limit,
					});
				}
			},
			None => cmd.output().await,
		};

		let output = output.map_err(|e| {
			tracing::warn!(command = %command_line, error = %e, "command failed to spawn");
			ExecError::Spawn {
				command: command_line.clone(),
				source: e,
			}
		})?;

		let stdout = String::from_utf8_lossy(&output.stdout).to_string();
		let stderr = String::from_utf8_lossy(&output.stderr).to_string();

		tracing::debug!(
			exit_code = ?output.status.code(),
			stdout_len = output.stdout.len(),
			stderr_len = output.stderr.len(),
			"command completed"
		);

		if output.status.success() {
			Ok(stdout)
		} else {
			Err(ExecError::Failed {
				command: command_line,
				code: output.status.code(),
				stdout,
				stderr,
			})
		}
	}
}
