// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use thiserror::Error;

/// Result type alias for command execution.
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors that can occur while running an external command.
#[derive(Error, Debug)]
pub enum ExecError {
	#[error("Failed to spawn {command:?}: {source}")]
	Spawn {
		command: String,
		#[source]
		source: std::io::Error,
	},

	#[error("Command {command:?} failed (exit code {}): {}", exit_label(.code), .stderr.trim())]
	Failed {
		command: String,
		code: Option<i32>,
		stdout: String,
		stderr: String,
	},

	#[error("Command {command:?} timed out after {timeout:?}")]
	TimedOut { command: String, timeout: Duration },
}

impl ExecError {
	/// Build a non-zero-exit failure.
	pub fn failed(command: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
		ExecError::Failed {
			command: command.into(),
			code,
			stdout: String::new(),
			stderr: stderr.into(),
		}
	}

	/// Captured stdout of a failed command, if it produced any.
	pub fn stdout(&self) -> Option<&str> {
		match self {
			ExecError::Failed { stdout, .. } if !stdout.is_empty() => Some(stdout),
			_ => None,
		}
	}
}

fn exit_label(code: &Option<i32>) -> String {
	match code {
		Some(code) => code.to_string(),
		None => "signal".to_string(),
	}
}
