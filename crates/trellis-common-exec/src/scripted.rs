// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{ExecError, ExecResult};
use crate::runner::CommandRunner;

/// A command observed by [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
	pub command: String,
	pub elevated: bool,
}

struct Rule {
	pattern: String,
	responses: VecDeque<ExecResult<String>>,
}

#[derive(Default)]
struct State {
	rules: Vec<Rule>,
	calls: Vec<RecordedCommand>,
}

/// A command runner that replays scripted responses and records every call.
///
/// Responses are matched by substring against the command line. Each rule
/// answers in FIFO order; commands with no pending response succeed with
/// empty output.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
	state: Arc<Mutex<State>>,
}

impl ScriptedRunner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queue a response for the next command containing `pattern`.
	pub fn on(&self, pattern: &str, response: ExecResult<String>) -> &Self {
		let mut state = self.lock();
		match state.rules.iter_mut().find(|r| r.pattern == pattern) {
			Some(rule) => rule.responses.push_back(response),
			None => state.rules.push(Rule {
				pattern: pattern.to_string(),
				responses: VecDeque::from([response]),
			}),
		}
		self
	}

	/// Queue a successful response.
	pub fn on_ok(&self, pattern: &str, output: &str) -> &Self {
		self.on(pattern, Ok(output.to_string()))
	}

	/// Queue a non-zero exit for the next command containing `pattern`.
	pub fn on_fail(&self, pattern: &str, stderr: &str) -> &Self {
		self.on(pattern, Err(ExecError::failed(pattern, Some(1), stderr)))
	}

	/// Every command run so far, in order.
	pub fn calls(&self) -> Vec<RecordedCommand> {
		self.lock().calls.clone()
	}

	/// Command lines run so far, in order.
	pub fn commands(&self) -> Vec<String> {
		self.lock().calls.iter().map(|c| c.command.clone()).collect()
	}

	/// Number of commands containing `pattern`.
	pub fn count(&self, pattern: &str) -> usize {
		self
			.lock()
			.calls
			.iter()
			.filter(|c| c.command.contains(pattern))
			.count()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
	async fn run(&self, command: &str, elevated: bool) -> ExecResult<String> {
		let mut state = self.lock();
		state.calls.push(RecordedCommand {
			command: command.to_string(),
			elevated,
		});

		state
			.rules
			.iter_mut()
			.filter(|rule| command.contains(&rule.pattern))
			.find_map(|rule| rule.responses.pop_front())
			.unwrap_or_else(|| Ok(String::new()))
	}
}
