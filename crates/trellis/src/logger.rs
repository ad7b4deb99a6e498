// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Minimal sink a test framework must provide to receive harness output.
pub trait TestLogger: Send + Sync {
	fn log(&self, line: &str);

	fn log_error(&self, line: &str);

	/// Formatted variant, used with `format_args!`.
	fn log_fmt(&self, args: fmt::Arguments<'_>) {
		self.log(&args.to_string());
	}
}

/// Forwards test log lines to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TestLogger for TracingLogger {
	fn log(&self, line: &str) {
		tracing::info!(target: "trellis::test", "{line}");
	}

	fn log_error(&self, line: &str) {
		tracing::error!(target: "trellis::test", "{line}");
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeverity {
	Info,
	Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
	pub severity: LogSeverity,
	pub message: String,
}

/// Records every line for later assertions.
#[derive(Debug, Clone, Default)]
pub struct CapturingLogger {
	lines: Arc<Mutex<Vec<LogLine>>>,
}

impl CapturingLogger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn lines(&self) -> Vec<LogLine> {
		self.lock().clone()
	}

	pub fn errors(&self) -> Vec<String> {
		self
			.lock()
			.iter()
			.filter(|l| l.severity == LogSeverity::Error)
			.map(|l| l.message.clone())
			.collect()
	}

	pub fn contains(&self, needle: &str) -> bool {
		self.lock().iter().any(|l| l.message.contains(needle))
	}

	fn push(&self, severity: LogSeverity, line: &str) {
		self.lock().push(LogLine {
			severity,
			message: line.to_string(),
		});
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogLine>> {
		self.lines.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl TestLogger for CapturingLogger {
	fn log(&self, line: &str) {
		self.push(LogSeverity::Info, line);
	}

	fn log_error(&self, line: &str) {
		self.push(LogSeverity::Error, line);
	}
}

/// A [`TestLogger`] plus the verbose flag from configuration.
#[derive(Clone)]
pub struct Logger {
	sink: Arc<dyn TestLogger>,
	verbose: bool,
}

impl Logger {
	pub fn new(sink: Arc<dyn TestLogger>, verbose: bool) -> Self {
		Self { sink, verbose }
	}

	pub fn is_verbose(&self) -> bool {
		self.verbose
	}

	pub fn log(&self, line: &str) {
		self.sink.log(line);
	}

	pub fn log_error(&self, line: &str) {
		self.sink.log_error(line);
	}

	pub fn log_fmt(&self, args: fmt::Arguments<'_>) {
		self.sink.log_fmt(args);
	}

	/// Logged only in verbose mode.
	pub fn log_debug(&self, line: &str) {
		if self.verbose {
			self.sink.log(line);
		}
	}

	pub fn log_debug_error(&self, line: &str) {
		if self.verbose {
			self.sink.log_error(line);
		}
	}
}

impl fmt::Debug for Logger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Logger")
			.field("verbose", &self.verbose)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn debug_lines_respect_verbose_flag() {
		let capture = CapturingLogger::new();
		let quiet = Logger::new(Arc::new(capture.clone()), false);
		quiet.log_debug("hidden");
		quiet.log("shown");

		let loud = Logger::new(Arc::new(capture.clone()), true);
		loud.log_debug("debug shown");
		loud.log_debug_error("debug error");

		assert!(!capture.contains("hidden"));
		assert!(capture.contains("debug shown"));
		assert_eq!(capture.lines().len(), 3);
		assert_eq!(capture.errors(), vec!["debug error"]);
	}

	#[test]
	fn formatted_lines() {
		let capture = CapturingLogger::new();
		let logger = Logger::new(Arc::new(capture.clone()), false);
		logger.log_fmt(format_args!("pod {} is {}", "web-1", "Running"));
		assert!(capture.contains("pod web-1 is Running"));
	}
}
